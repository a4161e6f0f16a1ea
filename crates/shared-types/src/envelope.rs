//! # `QueueEnvelope` Delivery Wrapper
//!
//! Every message taken off a queue is handed to consumers wrapped in this
//! envelope. The queue owns the header; consumers only read the payload.
//!
//! ## Delivery Properties
//!
//! - **Versioning**: `version` lets consumers reject payloads from a newer producer.
//! - **At-least-once**: `attempt` counts redeliveries of the same `delivery_id`.
//! - **Routing**: `queue` names the logical queue the message came from.

use crate::entities::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message as delivered by a queue backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEnvelope<T> {
    // =========================================================================
    // HEADER SECTION
    // =========================================================================
    /// Envelope format version.
    pub version: u16,

    /// Identifies this delivery for ack / nack / dead-letter.
    pub delivery_id: Uuid,

    /// Logical queue name.
    pub queue: String,

    /// When the producer enqueued the message.
    pub enqueued_at: Timestamp,

    /// 1 on first delivery, incremented on each redelivery.
    pub attempt: u32,

    // =========================================================================
    // PAYLOAD SECTION
    // =========================================================================
    pub payload: T,
}

impl<T> QueueEnvelope<T> {
    /// Current envelope version.
    pub const CURRENT_VERSION: u16 = 1;

    /// Wrap a payload for its first delivery.
    pub fn new(queue: impl Into<String>, enqueued_at: Timestamp, payload: T) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            delivery_id: Uuid::new_v4(),
            queue: queue.into(),
            enqueued_at,
            attempt: 1,
            payload,
        }
    }

    /// Same delivery, next attempt.
    #[must_use]
    pub fn redelivered(mut self) -> Self {
        self.attempt = self.attempt.saturating_add(1);
        self
    }

    /// Replace the payload, keeping the header.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueueEnvelope<U> {
        QueueEnvelope {
            version: self.version,
            delivery_id: self.delivery_id,
            queue: self.queue,
            enqueued_at: self.enqueued_at,
            attempt: self.attempt,
            payload: f(self.payload),
        }
    }
}
