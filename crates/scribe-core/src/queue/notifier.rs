//! Event notifier: synchronous, best-effort pub/sub for lifecycle events.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::RwLock;

use crate::domain::{EventKind, QueueEvent};

type Listener = Box<dyn Fn(&QueueEvent) + Send + Sync>;

/// In-process observer registry.
///
/// Design intent:
/// - `emit` fires listeners synchronously on the caller's task and never
///   awaits, so queue operations can't be blocked by a slow observer setup.
/// - A panicking listener is caught and logged; it must never fail the queue
///   operation that triggered the event.
#[derive(Default)]
pub struct EventNotifier {
    listeners: RwLock<Vec<(EventKind, Listener)>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to one event kind.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.write().push((kind, Box::new(listener)));
    }

    /// Fire an event to all listeners subscribed to its kind.
    pub fn emit(&self, event: &QueueEvent) {
        let listeners = self.read();
        for (kind, listener) in listeners.iter() {
            if *kind != event.kind() {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!(
                    job_id = %event.job().id,
                    event = ?event.kind(),
                    "event listener panicked; ignoring"
                );
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(EventKind, Listener)>> {
        match self.listeners.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<(EventKind, Listener)>> {
        match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
