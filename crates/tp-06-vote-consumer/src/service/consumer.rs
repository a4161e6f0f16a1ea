//! One consumer: dequeue, handle, settle, until shutdown or a queue failure.

use super::stats::DeliveryStats;
use crate::domain::{ConsumerConfig, Disposition, QueueError};
use crate::ports::{Delivery, MessageHandler, MessageQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Why a consumer loop returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
}

#[derive(Clone)]
pub struct ConsumerLoop {
    queue_name: String,
    queue: Arc<dyn MessageQueue>,
    handler: Arc<dyn MessageHandler>,
    config: ConsumerConfig,
    stats: Arc<DeliveryStats>,
}

impl ConsumerLoop {
    pub fn new(
        queue_name: impl Into<String>,
        queue: Arc<dyn MessageQueue>,
        handler: Arc<dyn MessageHandler>,
        config: ConsumerConfig,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            queue,
            handler,
            config,
            stats,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Run until `shutdown` flips to true (or its sender is dropped).
    ///
    /// A queue failure ends the loop with the error; restarting it is the
    /// supervisor's job. A delivery being handled when shutdown arrives is
    /// finished and settled first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<LoopExit, QueueError> {
        let timeout = Duration::from_millis(self.config.dequeue_timeout_ms);
        debug!(queue = %self.queue_name, "Consumer started");
        loop {
            if *shutdown.borrow() {
                return Ok(LoopExit::Shutdown);
            }
            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(LoopExit::Shutdown);
                    }
                    continue;
                }
                next = self.queue.dequeue(&self.queue_name, timeout) => next,
            };
            match next {
                Ok(Some(delivery)) => {
                    self.process(delivery).await?;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(queue = %self.queue_name, error = %e, "Dequeue failed, consumer stopping");
                    return Err(e);
                }
            }
        }
    }

    /// Handle one delivery and settle it with the queue.
    pub async fn process(&self, delivery: Delivery) -> Result<Disposition, QueueError> {
        DeliveryStats::incr(&self.stats.received);
        let id = delivery.delivery_id;
        let disposition = self.handler.handle(&delivery).await;

        match &disposition {
            Disposition::Ack => {
                self.queue.ack(id).await?;
                DeliveryStats::incr(&self.stats.acked);
            }
            Disposition::Requeue(delay) => {
                self.queue.requeue_after(id, *delay).await?;
                DeliveryStats::incr(&self.stats.requeued);
            }
            Disposition::DeadLetter(reason) => {
                self.queue.dead_letter(id, reason).await?;
                DeliveryStats::incr(&self.stats.dead_lettered);
                warn!(queue = %self.queue_name, delivery_id = %id, reason = %reason, "Delivery dead-lettered");
            }
        }
        debug!(
            queue = %self.queue_name,
            delivery_id = %id,
            attempt = delivery.attempt,
            outcome = disposition.as_str(),
            "Delivery settled"
        );
        Ok(disposition)
    }
}
