//! Pending-reply table — correlates replies to requests by message kind.
//!
//! DESIGN
//! ======
//! The wire protocol carries no request identifier, so a reply can only be
//! matched by its kind. Waiters for a kind queue FIFO and the first reply
//! observed resolves the oldest waiter still being awaited. Two outstanding
//! requests of the same kind therefore cannot be told apart — the second may
//! receive the first's answer. The protocol is fixed on the service side, so
//! this hazard is documented rather than worked around.
//!
//! A waiter whose caller timed out has dropped its receiving half; such
//! entries are skipped and discarded during resolution, and a reply that
//! finds no live waiter resolves nothing.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::message::MessageKind;

/// FIFO waiter queues keyed by expected reply kind.
#[derive(Debug, Default)]
pub struct ReplyTable {
    waiters: HashMap<MessageKind, VecDeque<oneshot::Sender<Value>>>,
}

impl ReplyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a waiter for the next message of `kind`. The caller enforces its
    /// own deadline on the returned receiver; dropping it abandons the slot.
    pub fn register(&mut self, kind: MessageKind) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.waiters.entry(kind).or_default().push_back(tx);
        rx
    }

    /// Resolve the oldest live waiter for `kind` with `payload`.
    ///
    /// Returns `true` when a waiter consumed the payload, `false` when none
    /// was live — the router then drops the payload (or fans it out, for push
    /// kinds).
    pub fn resolve(&mut self, kind: MessageKind, payload: &Value) -> bool {
        let Some(queue) = self.waiters.get_mut(&kind) else {
            return false;
        };
        while let Some(waiter) = queue.pop_front() {
            if waiter.send(payload.clone()).is_ok() {
                return true;
            }
            // Receiver gone: that caller timed out. Try the next waiter.
        }
        false
    }

    /// Waiters currently registered for `kind`, live or stale.
    #[must_use]
    pub fn waiting(&self, kind: MessageKind) -> usize {
        self.waiters.get(&kind).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
#[path = "reply_test.rs"]
mod tests;
