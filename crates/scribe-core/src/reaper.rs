//! Reaper: recovery of claims held by crashed workers.
//!
//! The claim protocol itself has no timeouts; a worker that dies while
//! holding a claim leaves its job `Running` forever. The reaper is the
//! watchdog that scans for such jobs and force-releases them, built entirely
//! on the queue's public surface.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::queue::JobQueue;

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Pause between scans.
    pub interval: Duration,
    /// How long a job may stay `Running` before it is considered abandoned.
    /// Must comfortably exceed the longest legitimate processor run.
    pub claim_deadline: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            claim_deadline: Duration::from_secs(600),
        }
    }
}

/// Background reaper handle.
pub struct Reaper {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Reaper {
    pub fn spawn(queue: Arc<JobQueue>, config: ReaperConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            reaper_loop(queue, config, &mut shutdown_rx).await;
        });

        Self { shutdown_tx, join }
    }

    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

async fn reaper_loop(
    queue: Arc<JobQueue>,
    config: ReaperConfig,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    tracing::debug!("reaper started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }

        match queue.release_stuck(config.claim_deadline).await {
            Ok(released) if !released.is_empty() => {
                tracing::info!(count = released.len(), "recovered stuck claims");
            }
            Ok(_) => {}
            Err(error) => {
                tracing::error!(%error, "reaper scan failed");
            }
        }
    }

    tracing::debug!("reaper stopped");
}
