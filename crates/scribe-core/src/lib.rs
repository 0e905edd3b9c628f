//! scribe-core
//!
//! Job queue and worker dispatch for the scribe content pipeline: crawls,
//! keyword expansion, article planning, metrics refreshes and the rest of
//! the site automation work run through here.
//!
//! # Module map
//! - **domain**: ids, job kinds, typed payloads, the job record state
//!   machine, lifecycle events
//! - **ports**: seams to the outside world (JobStore, Clock, IdGenerator)
//! - **queue**: the engine — enqueue with dedup, atomic reservation, job
//!   handles, retry/backoff, the in-memory store, the event notifier
//! - **runtime**: processor trait + registry, dispatch by job kind
//! - **worker**: polling worker group with graceful shutdown
//! - **reaper**: watchdog recovering claims from crashed workers
//!
//! # Guarantees
//! - At-least-once execution: a claim is exclusive, and a claim whose worker
//!   dies is recoverable (release / reaper), never lost.
//! - De-duplication: at most one non-terminal job per `(kind, site,
//!   payload-subset)` fingerprint.
//! - Ordering: priority descending, then earliest `run_at`, then FIFO.

pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod reaper;
pub mod runtime;
pub mod worker;

pub use domain::{EventKind, JobId, JobKind, JobPayload, JobRecord, JobStatus, QueueEvent, SiteId};
pub use error::{ProcessorError, QueueError};
pub use queue::{
    Disposition, EnqueueOptions, EnqueueOutcome, JobHandle, JobQueue, QueueConfig, ReleaseOptions,
    ReserveFilter, RetryPolicy, retry_call,
};
pub use runtime::{Processor, ProcessorRegistry, Runtime};
pub use worker::{WorkerConfig, WorkerGroup};
