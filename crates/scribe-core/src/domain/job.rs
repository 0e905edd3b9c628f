//! Job record and status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{JobId, SiteId};
use super::kind::JobKind;
use super::payload::JobPayload;

/// Job status.
///
/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Queued -> Running -> Queued (retry with backoff, or voluntary release)
/// - Queued -> Running -> Failed (max_attempts exhausted)
///
/// Design note: using an enum ensures exhaustive matching and prevents
/// invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Eligible for reservation once `run_at` has passed.
    Queued,

    /// Exclusively claimed by one worker.
    Running,

    /// Completed successfully. Terminal.
    Succeeded,

    /// Failed with no attempts left. Terminal.
    Failed,
}

impl JobStatus {
    /// Is this a terminal state (the job will never be reserved again)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Is this job eligible for reservation (subject to `run_at`)?
    pub fn is_runnable(self) -> bool {
        matches!(self, JobStatus::Queued)
    }
}

/// Durable snapshot of one job.
///
/// Design:
/// - This is the single source of truth for job state; the store holds one
///   record per job and every mutation goes through `claim` or a handle
///   already holding a claim.
/// - All state transitions live here as methods, so store implementations
///   share one transition table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub site_id: SiteId,
    pub payload: JobPayload,
    pub status: JobStatus,

    /// Number of times this job has been claimed.
    pub attempts: u32,
    pub max_attempts: u32,

    /// Higher value is served first among otherwise-eligible jobs.
    pub priority: i32,

    /// Earliest time the job becomes eligible for reservation.
    pub run_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Failure detail of the most recent failed attempt.
    pub last_error: Option<String>,
}

impl JobRecord {
    pub fn new(
        id: JobId,
        site_id: SiteId,
        payload: JobPayload,
        priority: i32,
        run_at: DateTime<Utc>,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: payload.kind(),
            site_id,
            payload,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts,
            priority,
            run_at,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }

    /// Dedup key: at most one non-terminal job per fingerprint.
    pub fn fingerprint(&self) -> String {
        fingerprint(self.kind, self.site_id, &self.payload)
    }

    /// Is this job due and eligible for reservation at `now`?
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_runnable() && self.run_at <= now
    }

    /// Claim transition: Queued -> Running, counts the attempt.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.attempts += 1;
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Running -> Succeeded. Terminal.
    pub fn mark_succeeded(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Succeeded;
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    /// Running -> Failed. Terminal, no further `run_at` is scheduled.
    pub fn mark_failed(&mut self, error: String, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.last_error = Some(error);
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    /// Running -> Queued with a backoff deadline after a failed attempt.
    ///
    /// Invariant: `run_at` never decreases across retries of the same job.
    pub fn requeue_for_retry(&mut self, run_at: DateTime<Utc>, error: String, now: DateTime<Utc>) {
        debug_assert!(run_at >= self.run_at);
        self.status = JobStatus::Queued;
        self.run_at = run_at;
        self.last_error = Some(error);
        self.updated_at = now;
    }

    /// Running -> Queued without an attempt penalty (voluntary release or
    /// reaper recovery). Undoes the claim's attempt count so a released job
    /// keeps its full retry budget.
    pub fn requeue_released(
        &mut self,
        run_at: Option<DateTime<Utc>>,
        priority: Option<i32>,
        now: DateTime<Utc>,
    ) {
        self.status = JobStatus::Queued;
        self.attempts = self.attempts.saturating_sub(1);
        self.started_at = None;
        if let Some(run_at) = run_at {
            self.run_at = run_at;
        }
        if let Some(priority) = priority {
            self.priority = priority;
        }
        self.updated_at = now;
    }
}

/// Dedup fingerprint: `(kind, site, payload subset)`.
pub fn fingerprint(kind: JobKind, site_id: SiteId, payload: &JobPayload) -> String {
    format!("{}:{}:{}", kind.as_str(), site_id, payload.fingerprint_key())
}
