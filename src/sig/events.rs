//! Graph-changed notifications.
//!
//! The graph publishes; it never depends on whoever listens.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use crate::model::{InterId, RelId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigEvent {
    InterAdded(InterId),
    InterRemoved(InterId),
    RelationAdded(RelId),
    RelationRemoved(RelId),
}

/// Subscriber contract. Called synchronously from the mutating thread.
pub trait SigListener: Send + Sync {
    fn on_event(&self, event: &SigEvent);
}

/// Records every event; drained with `take()`.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<SigEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drain recorded events, oldest first.
    pub fn take(&self) -> Vec<SigEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl SigListener for EventLog {
    fn on_event(&self, event: &SigEvent) {
        self.events.lock().push(*event);
    }
}
