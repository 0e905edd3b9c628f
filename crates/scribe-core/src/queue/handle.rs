//! Job handle: the capability returned by a successful reservation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};

use crate::domain::{JobId, JobRecord, QueueEvent};
use crate::error::QueueError;
use crate::ports::{Clock, JobStore, StatusPatch};
use crate::queue::notifier::EventNotifier;
use crate::queue::retry::RetryPolicy;

/// Overrides for [`JobHandle::release`]: defer the job or change its urgency
/// without counting a failure.
#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    pub run_at: Option<DateTime<Utc>>,
    pub priority: Option<i32>,
}

/// Exclusive handle on a claimed job.
///
/// Design intent:
/// - The claim already granted exclusivity, so resolution only needs the
///   per-handle flag; no re-check against storage beyond the initial claim.
/// - Exactly one of `complete` / `fail` / `release` may resolve the handle;
///   any further call fails with [`QueueError::AlreadyResolved`].
/// - A resolution that dies on a store outage un-resolves the handle so the
///   worker can report the outcome again once storage is back.
pub struct JobHandle {
    job: JobRecord,
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<EventNotifier>,
    retry: RetryPolicy,
    resolved: AtomicBool,
}

impl JobHandle {
    pub(crate) fn new(
        job: JobRecord,
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<EventNotifier>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            job,
            store,
            clock,
            notifier,
            retry,
            resolved: AtomicBool::new(false),
        }
    }

    /// Snapshot of the job as claimed (status `Running`, attempt counted).
    pub fn job(&self) -> &JobRecord {
        &self.job
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }

    /// Mark the job succeeded. Terminal.
    pub async fn complete(&self) -> Result<(), QueueError> {
        self.begin_resolution()?;
        let now = self.clock.now();
        match self.apply(StatusPatch::Succeed, now).await? {
            Some(job) => {
                self.notifier.emit(&QueueEvent::Succeeded { job });
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Report a failed attempt.
    ///
    /// While attempts remain the job goes back to `Queued` with a backoff
    /// deadline; otherwise it fails terminally. A `failed` event carries the
    /// error either way.
    pub async fn fail(&self, error: impl Into<String>) -> Result<(), QueueError> {
        self.begin_resolution()?;
        let error = error.into();
        let now = self.clock.now();

        let patch = if self.job.attempts < self.job.max_attempts {
            let delay = self.retry.delay_for(self.job.attempts);
            StatusPatch::RequeueRetry {
                run_at: now + Duration::milliseconds(delay.as_millis() as i64),
                error: error.clone(),
            }
        } else {
            StatusPatch::FailTerminal {
                error: error.clone(),
            }
        };

        match self.apply(patch, now).await? {
            Some(job) => {
                self.notifier.emit(&QueueEvent::Failed { job, error });
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Give the job back to the queue without an attempt penalty.
    pub async fn release(&self, options: ReleaseOptions) -> Result<(), QueueError> {
        self.begin_resolution()?;
        let now = self.clock.now();
        let patch = StatusPatch::Release {
            run_at: options.run_at,
            priority: options.priority,
        };
        match self.apply(patch, now).await? {
            Some(job) => {
                self.notifier.emit(&QueueEvent::Released { job });
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn begin_resolution(&self) -> Result<(), QueueError> {
        self.resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| QueueError::AlreadyResolved)
    }

    async fn apply(
        &self,
        patch: StatusPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, QueueError> {
        match self.store.update(self.job.id, patch, now).await {
            Ok(Some(job)) => Ok(Some(job)),
            Ok(None) => {
                // The claim was taken away underneath us (reaper recovery or
                // deletion). The outcome is already decided elsewhere.
                tracing::warn!(job_id = %self.job.id, "claim lost before resolution");
                Ok(None)
            }
            Err(error) => {
                self.resolved.store(false, Ordering::SeqCst);
                Err(error)
            }
        }
    }
}
