//! Event bus.
//!
//! Fires after an action invocation unless that invocation was
//! throttle-suppressed. Subscribers receive the struct-shaped payload;
//! the dict-shaped form is the only supported signature (the legacy
//! tuple signature is not carried forward).

use std::rc::Rc;

use crate::field::Context;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub input: String,
    pub label: String,
    pub mode: Option<String>,
    pub context: Context,
}

pub type Subscriber = Rc<dyn Fn(&Event)>;

#[derive(Default, Clone)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cb: Subscriber) {
        self.subscribers.push(cb);
    }

    /// Removes the first subscriber pointer-equal to `cb`.
    pub fn unregister(&mut self, cb: &Subscriber) {
        if let Some(pos) = self.subscribers.iter().position(|s| Rc::ptr_eq(s, cb)) {
            self.subscribers.remove(pos);
        }
    }

    pub fn publish(&self, event: &Event) {
        for sub in &self.subscribers {
            sub(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
