//! Lifecycle events emitted by the queue.

use serde::Serialize;

use super::job::JobRecord;

/// Discriminant for event subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Enqueued,
    Started,
    Released,
    Succeeded,
    Failed,
}

/// One lifecycle transition, carrying the job snapshot after the transition
/// (and the error for failures).
///
/// Delivery is synchronous-fire, best-effort, in-process; see
/// [`crate::queue::EventNotifier`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    Enqueued { job: JobRecord },
    Started { job: JobRecord },
    Released { job: JobRecord },
    Succeeded { job: JobRecord },
    Failed { job: JobRecord, error: String },
}

impl QueueEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            QueueEvent::Enqueued { .. } => EventKind::Enqueued,
            QueueEvent::Started { .. } => EventKind::Started,
            QueueEvent::Released { .. } => EventKind::Released,
            QueueEvent::Succeeded { .. } => EventKind::Succeeded,
            QueueEvent::Failed { .. } => EventKind::Failed,
        }
    }

    /// The job snapshot the event carries.
    pub fn job(&self) -> &JobRecord {
        match self {
            QueueEvent::Enqueued { job }
            | QueueEvent::Started { job }
            | QueueEvent::Released { job }
            | QueueEvent::Succeeded { job }
            | QueueEvent::Failed { job, .. } => job,
        }
    }
}
