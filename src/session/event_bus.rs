//! Broadcast channel for inbound messages.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every
//! non-lifecycle message the connection manager receives (request
//! responses and subscribed events alike) is published here so observers
//! can follow traffic without taking part in turn-taking.

use tokio::sync::broadcast;

use crate::protocol::ResponseEnvelope;

/// Broadcast bus for inbound [`ResponseEnvelope`]s.
///
/// When the ring buffer is full, the oldest messages are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ResponseEnvelope>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, as [`broadcast::channel`] does.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a message to all subscribers.
    ///
    /// Returns the number of receivers that received it. Without active
    /// receivers the message is silently dropped.
    pub fn publish(&self, envelope: ResponseEnvelope) -> usize {
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Creates a new receiver that will see all future messages.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ResponseEnvelope> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
