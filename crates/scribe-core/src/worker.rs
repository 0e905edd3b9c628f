//! Worker group: polling workers over a shared queue.
//!
//! The queue core mandates no scheduler; polling cadence is policy. This
//! module implements the standard policy — a fixed interval with additive
//! jitter so a fleet of workers doesn't poll in lockstep.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::queue::{JobQueue, ReleaseOptions, ReserveFilter};
use crate::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between reservation attempts when the queue is empty.
    pub poll_interval: Duration,
    /// Upper bound of the random addition to each pause.
    pub poll_jitter: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            poll_jitter: Duration::from_millis(200),
        }
    }
}

/// Worker group handle.
/// - `request_shutdown()` stops the group taking new reservations.
/// - `join()` via `shutdown_and_join()` waits for all workers to exit.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers polling `queue` with `filter`.
    pub fn spawn(
        n: usize,
        queue: Arc<JobQueue>,
        runtime: Arc<Runtime>,
        filter: ReserveFilter,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let queue = Arc::clone(&queue);
            let runtime = Arc::clone(&runtime);
            let filter = filter.clone();
            let config = config.clone();
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, queue, runtime, filter, config, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers. In-flight work is released back to
    /// the queue rather than abandoned mid-claim.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<JobQueue>,
    runtime: Arc<Runtime>,
    filter: ReserveFilter,
    config: WorkerConfig,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let handle = match queue.reserve_next(&filter).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                if pause(&config, shutdown_rx).await.is_break() {
                    break;
                }
                continue;
            }
            Err(error) => {
                tracing::warn!(worker_id, %error, "reservation failed; backing off");
                if pause(&config, shutdown_rx).await.is_break() {
                    break;
                }
                continue;
            }
        };

        // Race the processor against shutdown: a worker told to stop gives
        // its claim back so another worker can pick the job up. Biased so a
        // finished processor always reports its real outcome, even when the
        // shutdown signal arrives in the same instant.
        tokio::select! {
            biased;
            result = runtime.execute(handle.job()) => {
                let report = match result {
                    Ok(()) => handle.complete().await,
                    Err(error) => handle.fail(error.to_string()).await,
                };
                if let Err(error) = report {
                    tracing::warn!(worker_id, job_id = %handle.id(), %error, "failed to report outcome");
                }
            }
            _ = shutdown_rx.changed() => {
                if let Err(error) = handle.release(ReleaseOptions::default()).await {
                    tracing::warn!(worker_id, job_id = %handle.id(), %error, "failed to release on shutdown");
                }
            }
        }
    }

    tracing::debug!(worker_id, "worker stopped");
}

/// Sleep one poll interval (with jitter), racing shutdown.
async fn pause(config: &WorkerConfig, shutdown_rx: &mut watch::Receiver<bool>) -> ControlFlow<()> {
    let jitter = if config.poll_jitter > Duration::ZERO {
        rand::thread_rng().gen_range(Duration::ZERO..=config.poll_jitter)
    } else {
        Duration::ZERO
    };

    tokio::select! {
        changed = shutdown_rx.changed() => {
            // A closed channel means the group handle is gone: stop.
            if changed.is_err() { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        }
        _ = tokio::time::sleep(config.poll_interval + jitter) => ControlFlow::Continue(()),
    }
}
