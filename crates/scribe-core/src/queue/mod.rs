//! Queue engine: enqueue with dedup, atomic reservation, lifecycle handles.

pub mod handle;
pub mod memory;
pub mod notifier;
pub mod retry;

pub use handle::{JobHandle, ReleaseOptions};
pub use memory::InMemoryJobStore;
pub use notifier::EventNotifier;
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy, retry_call};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{
    EventKind, JobId, JobKind, JobPayload, JobRecord, JobStatus, QueueEvent, SiteId, fingerprint,
};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::ports::{
    Clock, IdGenerator, JobFilter, JobStore, StatusPatch, SystemClock, UlidGenerator,
};

/// Queue-wide configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Claim budget per job before it fails terminally.
    pub max_attempts: u32,
    pub retry: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Options for [`JobQueue::enqueue`].
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    /// Higher is served first. Defaults to 0.
    pub priority: i32,
    /// Earliest eligibility; defaults to now.
    pub run_at: Option<DateTime<Utc>>,
    /// Caller-assigned id. Re-submitting an id that already exists is an
    /// idempotent no-op (`Disposition::Skipped`).
    pub id: Option<JobId>,
}

/// How an enqueue request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// A new row was created.
    Queued,
    /// An in-flight job with the same fingerprint was returned instead.
    Reused,
    /// The caller-supplied id already exists; nothing was created.
    Skipped,
}

/// Result of [`JobQueue::enqueue`]: a job id the caller can poll, plus how it
/// was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub job_id: JobId,
    pub disposition: Disposition,
}

/// Filter for [`JobQueue::reserve_next`].
#[derive(Debug, Clone, Default)]
pub struct ReserveFilter {
    pub site_id: Option<SiteId>,
    pub kinds: Option<Vec<JobKind>>,
}

/// The job queue.
///
/// Design:
/// - One process-wide instance with explicit construction; every dependency
///   (store, clock, id generation) is injected, nothing is a module-level
///   singleton.
/// - The store's `claim` is the only synchronization the reservation path
///   needs; enqueue serializes its dedup-check-then-insert through a local
///   gate so one fingerprint can't slip in twice.
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    notifier: Arc<EventNotifier>,
    config: QueueConfig,
    enqueue_gate: Mutex<()>,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: QueueConfig,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            notifier: Arc::new(EventNotifier::new()),
            config,
            enqueue_gate: Mutex::new(()),
        }
    }

    /// Convenience wiring: in-memory store, system clock, ULID ids.
    pub fn in_memory(config: QueueConfig) -> Self {
        Self::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
            config,
        )
    }

    /// Subscribe a listener to one lifecycle event kind.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.notifier.on(kind, listener);
    }

    /// Enqueue a unit of work, deduplicating against in-flight jobs.
    ///
    /// Returns immediately with a job id; success or failure is observed
    /// later via [`JobQueue::get`] or events.
    pub async fn enqueue(
        &self,
        site_id: SiteId,
        payload: JobPayload,
        options: EnqueueOptions,
    ) -> Result<EnqueueOutcome, QueueError> {
        payload.validate().map_err(QueueError::Validation)?;
        let kind = payload.kind();

        // Serialize dedup-check-then-insert; claims contend in the store,
        // duplicate fingerprints are suppressed here.
        let gate = self.enqueue_gate.lock().await;

        if let Some(id) = options.id
            && self.store.get(id).await?.is_some()
        {
            return Ok(EnqueueOutcome {
                job_id: id,
                disposition: Disposition::Skipped,
            });
        }

        let fingerprint = fingerprint(kind, site_id, &payload);
        if let Some(existing) = self.store.find_active(&fingerprint).await? {
            tracing::debug!(job_id = %existing.id, %fingerprint, "reusing in-flight job");
            return Ok(EnqueueOutcome {
                job_id: existing.id,
                disposition: Disposition::Reused,
            });
        }

        let now = self.clock.now();
        let id = options.id.unwrap_or_else(|| self.ids.job_id());
        let job = JobRecord::new(
            id,
            site_id,
            payload,
            options.priority,
            options.run_at.unwrap_or(now),
            self.config.max_attempts,
            now,
        );
        self.store.insert(job.clone()).await?;
        drop(gate);

        tracing::debug!(job_id = %id, kind = %kind, site_id = %site_id, "job enqueued");
        self.notifier.emit(&QueueEvent::Enqueued { job });
        Ok(EnqueueOutcome {
            job_id: id,
            disposition: Disposition::Queued,
        })
    }

    /// Reserve the next eligible job, if any.
    ///
    /// Candidates are served priority-descending, then earliest `run_at`,
    /// then earliest `created_at` (stable FIFO within equal urgency). Losing
    /// a claim race moves on to the next candidate; an empty pass returns
    /// `None` and the caller polls again later.
    ///
    /// The returned handle has exclusive ownership: no other reservation can
    /// return the same job until it is released or reaches a terminal state.
    pub async fn reserve_next(
        &self,
        filter: &ReserveFilter,
    ) -> Result<Option<JobHandle>, QueueError> {
        let now = self.clock.now();
        let store_filter = JobFilter {
            site_id: filter.site_id,
            kinds: filter.kinds.clone(),
            statuses: Some(vec![JobStatus::Queued]),
            due_before: Some(now),
            started_before: None,
        };
        let mut candidates = self.store.list(&store_filter).await?;
        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.run_at.cmp(&b.run_at))
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        for candidate in candidates {
            match self.store.claim(candidate.id, self.clock.now()).await? {
                Some(job) => {
                    tracing::debug!(job_id = %job.id, attempt = job.attempts, "job claimed");
                    self.notifier.emit(&QueueEvent::Started { job: job.clone() });
                    return Ok(Some(JobHandle::new(
                        job,
                        Arc::clone(&self.store),
                        Arc::clone(&self.clock),
                        Arc::clone(&self.notifier),
                        self.config.retry.clone(),
                    )));
                }
                None => {
                    tracing::trace!(job_id = %candidate.id, "lost claim race; trying next candidate");
                }
            }
        }
        Ok(None)
    }

    /// Jobs matching the filter (audit/history included).
    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, QueueError> {
        self.store.list(filter).await
    }

    pub async fn get(&self, id: JobId) -> Result<Option<JobRecord>, QueueError> {
        self.store.get(id).await
    }

    /// Explicit removal; terminal jobs are otherwise retained for history.
    pub async fn delete(&self, id: JobId) -> Result<bool, QueueError> {
        self.store.delete(id).await
    }

    pub async fn counts(&self) -> Result<QueueCounts, QueueError> {
        self.store.counts_by_status().await
    }

    /// Force-release jobs stuck in `Running` longer than `older_than`.
    ///
    /// This is the watchdog utility behind [`crate::reaper::Reaper`]: a
    /// worker that crashed while holding a claim leaves its job running
    /// forever, and this returns such jobs to `Queued`. The conditional
    /// update means a live worker finishing concurrently wins the race.
    pub async fn release_stuck(
        &self,
        older_than: std::time::Duration,
    ) -> Result<Vec<JobId>, QueueError> {
        let now = self.clock.now();
        let cutoff = now - chrono::Duration::milliseconds(older_than.as_millis() as i64);
        let filter = JobFilter {
            statuses: Some(vec![JobStatus::Running]),
            started_before: Some(cutoff),
            ..JobFilter::default()
        };

        let mut released = Vec::new();
        for job in self.store.list(&filter).await? {
            let patch = StatusPatch::Release {
                run_at: None,
                priority: None,
            };
            if let Some(updated) = self.store.update(job.id, patch, now).await? {
                tracing::warn!(job_id = %updated.id, "force-released stuck claim");
                self.notifier.emit(&QueueEvent::Released { job: updated });
                released.push(job.id);
            }
        }
        Ok(released)
    }
}
