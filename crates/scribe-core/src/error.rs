use thiserror::Error;

use crate::domain::JobKind;

/// Errors surfaced by the queue core.
///
/// Claim conflicts are not here on purpose: losing a claim race is expected
/// and handled internally by trying the next candidate.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Malformed enqueue input. Rejected before any store mutation.
    #[error("invalid enqueue request: {0}")]
    Validation(String),

    /// A job handle was used twice. Programming error, not retried.
    #[error("job handle already resolved")]
    AlreadyResolved,

    /// No processor registered for the job kind.
    #[error("no processor registered for kind={0}")]
    ProcessorNotFound(JobKind),

    /// Two processors registered for the same kind.
    #[error("duplicate processor for kind={0}")]
    DuplicateProcessor(JobKind),

    /// Backing storage unreachable. Transient; callers retry at a higher
    /// level.
    #[error("job store unavailable: {0}")]
    StoreUnavailable(String),

    /// Opaque failure from a unit of work, counted against the retry budget.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Opaque error from a processor. The queue never interprets the content.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProcessorError(String);

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ProcessorError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ProcessorError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
