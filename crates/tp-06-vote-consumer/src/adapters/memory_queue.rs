//! In-process queue backend.
//!
//! FIFO per queue name. Dequeue waits on a `Notify` so blocked consumers
//! wake as soon as something is published or requeued. Delayed requeues
//! sit aside until due and then join the back of the queue. The whole
//! backend can be switched off to exercise the supervisor's restart path.

use crate::domain::QueueError;
use crate::ports::{Delivery, MessageQueue};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::{QueueEnvelope, TimeSource};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// A dead-lettered delivery and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub delivery: Delivery,
    pub reason: String,
}

pub struct InMemoryQueue {
    ready: Mutex<HashMap<String, VecDeque<Delivery>>>,
    delayed: Mutex<HashMap<String, Vec<(Instant, Delivery)>>>,
    in_flight: DashMap<Uuid, Delivery>,
    dead: Mutex<Vec<DeadLetter>>,
    available: AtomicBool,
    notify: Notify,
    time: Arc<dyn TimeSource>,
}

impl InMemoryQueue {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            ready: Mutex::new(HashMap::new()),
            delayed: Mutex::new(HashMap::new()),
            in_flight: DashMap::new(),
            dead: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            notify: Notify::new(),
            time,
        }
    }

    /// Simulate a backend outage. Every call fails while unavailable and
    /// blocked consumers wake up to notice.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead.lock().clone()
    }

    fn check_available(&self) -> Result<(), QueueError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(QueueError::Unavailable("in-memory queue switched off".into()))
        }
    }

    fn push(&self, delivery: Delivery) {
        self.ready
            .lock()
            .entry(delivery.queue.clone())
            .or_default()
            .push_back(delivery);
        self.notify.notify_waiters();
    }

    fn push_delayed(&self, delivery: Delivery, due: Instant) {
        self.delayed
            .lock()
            .entry(delivery.queue.clone())
            .or_default()
            .push((due, delivery));
        // Waiters recompute how long to sleep.
        self.notify.notify_waiters();
    }

    /// Move due deliveries of `queue` to the ready list, oldest due first.
    fn promote_due(&self, queue: &str, now: Instant) {
        let mut due = {
            let mut delayed = self.delayed.lock();
            let Some(waiting) = delayed.get_mut(queue) else {
                return;
            };
            let (due, later): (Vec<_>, Vec<_>) = waiting.drain(..).partition(|(at, _)| *at <= now);
            *waiting = later;
            due
        };
        if due.is_empty() {
            return;
        }
        due.sort_by_key(|(at, _)| *at);
        let mut ready = self.ready.lock();
        let list = ready.entry(queue.to_string()).or_default();
        list.extend(due.into_iter().map(|(_, delivery)| delivery));
    }

    fn next_due(&self, queue: &str) -> Option<Instant> {
        self.delayed
            .lock()
            .get(queue)
            .and_then(|waiting| waiting.iter().map(|(at, _)| *at).min())
    }

    fn pop(&self, queue: &str) -> Option<Delivery> {
        self.promote_due(queue, Instant::now());
        let delivery = self.ready.lock().get_mut(queue)?.pop_front()?;
        self.in_flight.insert(delivery.delivery_id, delivery.clone());
        Some(delivery)
    }

    fn settle(&self, delivery_id: Uuid) -> Result<Delivery, QueueError> {
        self.in_flight
            .remove(&delivery_id)
            .map(|(_, delivery)| delivery)
            .ok_or(QueueError::UnknownDelivery(delivery_id))
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<Uuid, QueueError> {
        self.check_available()?;
        let delivery = QueueEnvelope::new(queue, self.time.now(), payload);
        let id = delivery.delivery_id;
        self.push(delivery);
        Ok(id)
    }

    async fn dequeue(&self, queue: &str, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Registered before the check so a publish in between is not missed.
            let notified = self.notify.notified();
            self.check_available()?;
            if let Some(delivery) = self.pop(queue) {
                return Ok(Some(delivery));
            }
            let now = Instant::now();
            let remaining = deadline.saturating_duration_since(now);
            if remaining.is_zero() {
                return Ok(None);
            }
            let wait = self
                .next_due(queue)
                .map_or(remaining, |due| remaining.min(due.saturating_duration_since(now)));
            let _ = tokio::time::timeout(wait, notified).await;
        }
    }

    async fn ack(&self, delivery_id: Uuid) -> Result<(), QueueError> {
        self.check_available()?;
        self.settle(delivery_id).map(|_| ())
    }

    async fn nack(&self, delivery_id: Uuid, requeue: bool) -> Result<(), QueueError> {
        self.check_available()?;
        let delivery = self.settle(delivery_id)?;
        if requeue {
            self.push(delivery.redelivered());
        }
        Ok(())
    }

    async fn requeue_after(&self, delivery_id: Uuid, delay: Duration) -> Result<(), QueueError> {
        self.check_available()?;
        let delivery = self.settle(delivery_id)?.redelivered();
        if delay.is_zero() {
            self.push(delivery);
        } else {
            self.push_delayed(delivery, Instant::now() + delay);
        }
        Ok(())
    }

    async fn dead_letter(&self, delivery_id: Uuid, reason: &str) -> Result<(), QueueError> {
        self.check_available()?;
        let delivery = self.settle(delivery_id)?;
        self.dead.lock().push(DeadLetter {
            delivery,
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        self.check_available()?;
        let ready = self.ready.lock().get(queue).map_or(0, VecDeque::len);
        let delayed = self.delayed.lock().get(queue).map_or(0, Vec::len);
        Ok(ready + delayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ManualTimeSource;

    const Q: &str = "votes.link";

    fn queue() -> Arc<InMemoryQueue> {
        Arc::new(InMemoryQueue::new(Arc::new(ManualTimeSource::new(1_000))))
    }

    #[tokio::test]
    async fn test_fifo_and_ack() {
        let queue = queue();
        let first = queue.publish(Q, b"1".to_vec()).await.unwrap();
        queue.publish(Q, b"2".to_vec()).await.unwrap();
        assert_eq!(queue.depth(Q).await.unwrap(), 2);

        let delivery = queue.dequeue(Q, Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(delivery.delivery_id, first);
        assert_eq!(delivery.enqueued_at, 1_000);
        assert_eq!(queue.in_flight(), 1);

        queue.ack(first).await.unwrap();
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(queue.ack(first).await, Err(QueueError::UnknownDelivery(first)));
    }

    #[tokio::test]
    async fn test_requeue_bumps_attempt() {
        let queue = queue();
        let id = queue.publish(Q, b"x".to_vec()).await.unwrap();
        queue.dequeue(Q, Duration::ZERO).await.unwrap();
        queue.nack(id, true).await.unwrap();

        let again = queue.dequeue(Q, Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(again.delivery_id, id);
        assert_eq!(again.attempt, 2);

        queue.nack(id, false).await.unwrap();
        assert_eq!(queue.depth(Q).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_requeue_waits_until_due() {
        let queue = queue();
        let id = queue.publish(Q, b"x".to_vec()).await.unwrap();
        queue.dequeue(Q, Duration::ZERO).await.unwrap();
        queue.requeue_after(id, Duration::from_millis(300)).await.unwrap();
        assert_eq!(queue.depth(Q).await.unwrap(), 1);

        assert!(queue.dequeue(Q, Duration::from_millis(100)).await.unwrap().is_none());

        let start = Instant::now();
        let again = queue.dequeue(Q, Duration::from_secs(5)).await.unwrap().unwrap();
        assert_eq!(again.attempt, 2);
        assert!(start.elapsed() >= Duration::from_millis(190));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_requeue_does_not_block_fresh_messages() {
        let queue = queue();
        let slow = queue.publish(Q, b"slow".to_vec()).await.unwrap();
        queue.dequeue(Q, Duration::ZERO).await.unwrap();
        queue.requeue_after(slow, Duration::from_secs(1)).await.unwrap();
        queue.publish(Q, b"fresh".to_vec()).await.unwrap();

        let next = queue.dequeue(Q, Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(next.payload, b"fresh".to_vec());
    }

    #[tokio::test]
    async fn test_dead_letter_keeps_reason() {
        let queue = queue();
        let id = queue.publish(Q, b"junk".to_vec()).await.unwrap();
        queue.dequeue(Q, Duration::ZERO).await.unwrap();
        queue.dead_letter(id, "malformed").await.unwrap();

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "malformed");
        assert_eq!(dead[0].delivery.payload, b"junk".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dequeue_times_out_when_empty() {
        let queue = queue();
        let got = queue.dequeue(Q, Duration::from_millis(200)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_blocked_dequeue_wakes_on_publish() {
        let queue = queue();
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue(Q, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.publish(Q, b"late".to_vec()).await.unwrap();

        let delivery = consumer.await.unwrap().unwrap().unwrap();
        assert_eq!(delivery.payload, b"late".to_vec());
    }

    #[tokio::test]
    async fn test_outage_fails_every_call() {
        let queue = queue();
        queue.publish(Q, b"x".to_vec()).await.unwrap();
        queue.set_available(false);

        assert!(matches!(
            queue.dequeue(Q, Duration::ZERO).await,
            Err(QueueError::Unavailable(_))
        ));
        assert!(queue.depth(Q).await.is_err());

        queue.set_available(true);
        assert!(queue.dequeue(Q, Duration::ZERO).await.unwrap().is_some());
    }
}
