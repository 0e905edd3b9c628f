//! Ports: the seams between the queue core and the outside world.
//!
//! Each trait hides an external concern (durable storage, time, id
//! generation) so implementations can be swapped — in-memory for tests and
//! single-process deployments, a relational store for multi-process ones.

pub mod clock;
pub mod id_generator;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use id_generator::{IdGenerator, UlidGenerator};
pub use store::{JobFilter, JobStore, StatusPatch};
