//! JobStore port: the durable record store contract.
//!
//! The store is the only shared mutable resource in the system. `claim` is
//! the single correctness-critical primitive: it must be linearizable across
//! callers sharing the same backing storage. Every other operation may be a
//! plain read-then-write, because `claim` is the sole point of contention.
//!
//! A relational implementation wants an index on `(status, run_at)` for the
//! reservation scan and a fingerprint column (or unique partial index) for
//! [`JobStore::find_active`]. The in-memory implementation lives in
//! [`crate::queue::InMemoryJobStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{JobId, JobKind, JobRecord, JobStatus, SiteId};
use crate::error::QueueError;
use crate::observability::QueueCounts;

/// Filter for [`JobStore::list`]. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub site_id: Option<SiteId>,
    pub kinds: Option<Vec<JobKind>>,
    pub statuses: Option<Vec<JobStatus>>,
    /// Only jobs with `run_at <= due_before` (the reservation scan's "due
    /// now" bound).
    pub due_before: Option<DateTime<Utc>>,
    /// Only jobs with `started_at < started_before` (the reaper's staleness
    /// bound).
    pub started_before: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn matches(&self, job: &JobRecord) -> bool {
        if let Some(site_id) = self.site_id
            && job.site_id != site_id
        {
            return false;
        }
        if let Some(kinds) = &self.kinds
            && !kinds.contains(&job.kind)
        {
            return false;
        }
        if let Some(statuses) = &self.statuses
            && !statuses.contains(&job.status)
        {
            return false;
        }
        if let Some(due_before) = self.due_before
            && job.run_at > due_before
        {
            return false;
        }
        if let Some(started_before) = self.started_before {
            match job.started_at {
                Some(started_at) if started_at < started_before => {}
                _ => return false,
            }
        }
        true
    }
}

/// Mutation of a `Running` job. The only legal status writes besides `claim`:
/// each variant is one arrow out of `Running` in the state machine, so a
/// store cannot be asked for an unconditional status overwrite.
#[derive(Debug, Clone)]
pub enum StatusPatch {
    /// Running -> Succeeded.
    Succeed,
    /// Running -> Failed, terminal.
    FailTerminal { error: String },
    /// Running -> Queued with a backoff deadline; the attempt stays counted.
    RequeueRetry {
        run_at: DateTime<Utc>,
        error: String,
    },
    /// Running -> Queued without an attempt penalty, optionally deferring or
    /// reprioritizing.
    Release {
        run_at: Option<DateTime<Utc>>,
        priority: Option<i32>,
    },
}

/// Durable job record store.
///
/// Implementations must guarantee that [`JobStore::claim`] is atomic: no two
/// concurrent claims may both succeed for the same job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new record. Fails if the id already exists.
    async fn insert(&self, job: JobRecord) -> Result<(), QueueError>;

    async fn get(&self, id: JobId) -> Result<Option<JobRecord>, QueueError>;

    /// All records matching the filter, in no particular order.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, QueueError>;

    /// Atomic compare-and-set claim: Queued -> Running, counting the attempt
    /// and stamping `started_at`. Returns the claimed snapshot, or `None` if
    /// another caller won the race (or the job is gone).
    async fn claim(&self, id: JobId, now: DateTime<Utc>) -> Result<Option<JobRecord>, QueueError>;

    /// Apply a [`StatusPatch`] to a job that is currently `Running`. Returns
    /// the updated snapshot, or `None` if the job is missing or not running
    /// (the precondition failed).
    async fn update(
        &self,
        id: JobId,
        patch: StatusPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, QueueError>;

    /// Remove a record. Returns whether anything was deleted.
    async fn delete(&self, id: JobId) -> Result<bool, QueueError>;

    /// Find a non-terminal (queued or running) job with this fingerprint.
    async fn find_active(&self, fingerprint: &str) -> Result<Option<JobRecord>, QueueError>;

    /// Per-status counts for observability.
    async fn counts_by_status(&self) -> Result<QueueCounts, QueueError>;
}
