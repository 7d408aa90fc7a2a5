//! Event bus — kind-keyed fan-out of push messages.
//!
//! DESIGN
//! ======
//! Each subscriber is a bounded channel sender registered under one message
//! kind. Publishing walks the kind's list in registration order with
//! `try_send`: a full subscriber loses that message rather than stalling the
//! router, and a closed subscriber is pruned on the spot. A message published
//! with zero subscribers is dropped — there is no buffering.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::message::{MessageKind, ServiceMessage};

/// Identifies one subscription for later removal.
pub type SubscriptionId = Uuid;

/// Channel capacity per subscriber. Traffic updates arrive continuously while
/// a scan runs; a slow consumer loses updates rather than backing up the
/// router.
const SUBSCRIBER_CAPACITY: usize = 256;

/// Fan-out registry for push-kind messages.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: HashMap<MessageKind, Vec<(SubscriptionId, mpsc::Sender<ServiceMessage>)>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one kind. Returns the id used to unsubscribe
    /// plus the receiving half.
    pub fn subscribe(
        &mut self,
        kind: MessageKind,
    ) -> (SubscriptionId, mpsc::Receiver<ServiceMessage>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = Uuid::new_v4();
        self.subscribers.entry(kind).or_default().push((id, tx));
        (id, rx)
    }

    /// Remove one subscriber. Unknown ids are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subs in self.subscribers.values_mut() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Deliver a message to every current subscriber of its kind, in
    /// registration order. Closed subscribers are pruned.
    pub fn publish(&mut self, message: &ServiceMessage) {
        let Some(subs) = self.subscribers.get_mut(&message.kind) else {
            return;
        };
        subs.retain(|(id, tx)| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(%id, kind = %message.kind, "subscriber lagging; message skipped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Current subscriber count for one kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[path = "bus_test.rs"]
mod tests;
