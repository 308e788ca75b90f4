//! Cross-thread event delivery.
//!
//! Another thread posts events through an [`InterruptHandle`]; the
//! evaluator thread consumes them at its poll points (method entry, loop
//! iterations, `next`/`redo`/`retry`, `case`). Polling is a single atomic
//! load when nothing is pending.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreadEvent {
    /// Raise `Interrupt` with the given message.
    Interrupt(String),
    /// Unwind the thread; cannot be rescued.
    Kill,
}

#[derive(Default)]
struct EventQueue {
    pending: AtomicBool,
    events: Mutex<VecDeque<ThreadEvent>>,
}

/// Sending side of a thread's event queue. Cheap to clone.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    queue: Arc<EventQueue>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, event: ThreadEvent) {
        let mut events = self.queue.events.lock();
        events.push_back(event);
        self.queue.pending.store(true, Ordering::Release);
    }

    pub fn interrupt(&self, message: impl Into<String>) {
        self.post(ThreadEvent::Interrupt(message.into()));
    }

    pub fn kill(&self) {
        self.post(ThreadEvent::Kill);
    }

    pub fn has_pending(&self) -> bool {
        self.queue.pending.load(Ordering::Acquire)
    }

    /// Next pending event, if any.
    pub(crate) fn take(&self) -> Option<ThreadEvent> {
        if !self.has_pending() {
            return None;
        }
        let mut events = self.queue.events.lock();
        let event = events.pop_front();
        if events.is_empty() {
            self.queue.pending.store(false, Ordering::Release);
        }
        event
    }
}
