//! # Outbound Port - MessageQueue
//!
//! At-least-once queue backend. A dequeued delivery stays in flight until it
//! is acked, nacked or dead-lettered; a nack with requeue hands it out again
//! with `attempt + 1`, after a delay when one is given.

use crate::domain::QueueError;
use async_trait::async_trait;
use shared_types::QueueEnvelope;
use std::time::Duration;
use uuid::Uuid;

/// A raw delivery; the payload is the JSON message body.
pub type Delivery = QueueEnvelope<Vec<u8>>;

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue `payload` on `queue`, returning the delivery id.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<Uuid, QueueError>;

    /// Block up to `timeout` for the next delivery. `Ok(None)` on timeout.
    async fn dequeue(&self, queue: &str, timeout: Duration) -> Result<Option<Delivery>, QueueError>;

    async fn ack(&self, delivery_id: Uuid) -> Result<(), QueueError>;

    /// Give a delivery back; it is dropped unless `requeue` is set.
    async fn nack(&self, delivery_id: Uuid, requeue: bool) -> Result<(), QueueError>;

    /// Requeue a delivery that must not be handed out before `delay` has
    /// passed.
    async fn requeue_after(&self, delivery_id: Uuid, delay: Duration) -> Result<(), QueueError>;

    async fn dead_letter(&self, delivery_id: Uuid, reason: &str) -> Result<(), QueueError>;

    /// Deliveries waiting on `queue`, delayed ones included and in-flight
    /// ones excluded.
    async fn depth(&self, queue: &str) -> Result<usize, QueueError>;
}
