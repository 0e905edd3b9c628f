//! Domain model (ids, kinds, payloads, job records, events).

pub mod events;
pub mod ids;
pub mod job;
pub mod kind;
pub mod payload;

pub use events::{EventKind, QueueEvent};
pub use ids::{Id, IdMarker, JobId, SiteId};
pub use job::{JobRecord, JobStatus, fingerprint};
pub use kind::JobKind;
pub use payload::JobPayload;
