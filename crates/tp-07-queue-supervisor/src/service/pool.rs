//! One queue's consumer pool.
//!
//! The runner spawns a generation of `target` consumer loops into a
//! `JoinSet` and watches three things: supervisor shutdown, a new target
//! size, and consumers ending. Any of them ends the generation; the runner
//! stops the survivors, waits up to the grace period for them to settle
//! their in-flight delivery, and decides what comes next.

use super::stats::SupervisorStats;
use crate::domain::{BackoffPolicy, PoolState, PoolStatus};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, PipelineEvent};
use std::sync::Arc;
use std::time::Duration;
use tippr_telemetry::metrics::{CRITICAL_ERRORS, POOL_CONSUMERS, POOL_RESTARTS};
use tippr_telemetry::{log_queue_event, metric_inc};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tp_06_vote_consumer::{
    ConsumerConfig, ConsumerLoop, DeliveryStats, LoopExit, MessageHandler, MessageQueue,
    QueueError, QueueName,
};

pub(crate) const COMPONENT: &str = "queue_supervisor";

type ConsumerSet = JoinSet<Result<LoopExit, QueueError>>;

enum GenerationEnd {
    Shutdown,
    Resized,
    QueueDown(QueueError),
}

pub(crate) struct PoolRunner {
    pub(crate) queue_name: QueueName,
    pub(crate) queue: Arc<dyn MessageQueue>,
    pub(crate) handler: Arc<dyn MessageHandler>,
    pub(crate) publisher: Arc<dyn EventPublisher>,
    pub(crate) consumer: ConsumerConfig,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) grace: Duration,
    pub(crate) status: Arc<Mutex<PoolStatus>>,
    pub(crate) deliveries: Arc<DeliveryStats>,
    pub(crate) stats: Arc<SupervisorStats>,
}

impl PoolRunner {
    pub(crate) async fn run(
        self,
        mut target: watch::Receiver<usize>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut attempt = 0u32;
        loop {
            if *shutdown.borrow() {
                break;
            }
            let size = *target.borrow_and_update();
            if size == 0 {
                self.transition(PoolState::Disabled, 0).await;
                let keep_going = tokio::select! {
                    changed = shutdown.changed() => changed.is_ok(),
                    changed = target.changed() => changed.is_ok(),
                };
                if !keep_going {
                    break;
                }
                continue;
            }

            if attempt > 0 {
                if let Err(e) = self.queue.depth(self.queue_name.as_str()).await {
                    attempt += 1;
                    if !self.back_off(attempt, &e, &mut target, &mut shutdown).await {
                        break;
                    }
                    continue;
                }
                log_queue_event!(info, COMPONENT, "Queue reachable again", self.queue_name, attempt);
                attempt = 0;
            }

            match self.run_generation(size, &mut target, &mut shutdown).await {
                GenerationEnd::Shutdown => break,
                GenerationEnd::Resized => {}
                GenerationEnd::QueueDown(e) => {
                    attempt += 1;
                    if !self.back_off(attempt, &e, &mut target, &mut shutdown).await {
                        break;
                    }
                }
            }
        }
        self.transition(PoolState::Stopped, 0).await;
        log_queue_event!(info, COMPONENT, "Consumer pool stopped", self.queue_name);
    }

    async fn run_generation(
        &self,
        size: usize,
        target: &mut watch::Receiver<usize>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> GenerationEnd {
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = ConsumerLoop::new(
            self.queue_name.as_str(),
            Arc::clone(&self.queue),
            Arc::clone(&self.handler),
            self.consumer.clone(),
            Arc::clone(&self.deliveries),
        );
        let mut consumers = ConsumerSet::new();
        for _ in 0..size {
            consumers.spawn(consumer.clone().run(stop_rx.clone()));
        }
        SupervisorStats::incr(&self.stats.generations);
        log_queue_event!(info, COMPONENT, "Consumer pool started", self.queue_name, consumers = size);
        self.transition(PoolState::Running, size).await;

        let end = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break GenerationEnd::Shutdown;
                    }
                }
                changed = target.changed() => {
                    if changed.is_err() {
                        break GenerationEnd::Shutdown;
                    }
                    break GenerationEnd::Resized;
                }
                joined = consumers.join_next() => match joined {
                    Some(Ok(Ok(LoopExit::Shutdown))) => {}
                    Some(Ok(Err(e))) => break GenerationEnd::QueueDown(e),
                    Some(Err(e)) => {
                        metric_inc!(CRITICAL_ERRORS, &[COMPONENT]);
                        log_queue_event!(error, COMPONENT, "Consumer task failed", self.queue_name, error = %e);
                        break GenerationEnd::QueueDown(QueueError::Unavailable(format!(
                            "consumer task failed: {e}"
                        )));
                    }
                    None => {
                        break GenerationEnd::QueueDown(QueueError::Unavailable(
                            "every consumer exited".into(),
                        ));
                    }
                },
            }
        };

        let _ = stop_tx.send(true);
        self.drain(&mut consumers).await;
        end
    }

    async fn drain(&self, consumers: &mut ConsumerSet) {
        let settled = tokio::time::timeout(self.grace, async {
            while consumers.join_next().await.is_some() {}
        })
        .await;
        if settled.is_err() {
            log_queue_event!(
                warn,
                COMPONENT,
                "Consumers did not stop within grace period, aborting",
                self.queue_name,
                remaining = consumers.len()
            );
            consumers.abort_all();
            while consumers.join_next().await.is_some() {}
        }
    }

    /// Sleep before the next restart attempt. Returns `false` when the
    /// supervisor is shutting down instead.
    async fn back_off(
        &self,
        attempt: u32,
        error: &QueueError,
        target: &mut watch::Receiver<usize>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let delay = self.backoff.next_delay(attempt);
        let restarts = {
            let mut status = self.status.lock();
            status.restarts += 1;
            status.last_error = Some(error.to_string());
            status.restarts
        };
        SupervisorStats::incr(&self.stats.restarts);
        POOL_RESTARTS
            .with_label_values(&[self.queue_name.as_str()])
            .set(restarts as i64);

        let delay_ms = delay.as_millis() as u64;
        log_queue_event!(
            warn,
            COMPONENT,
            "Queue unavailable, pool backing off",
            self.queue_name,
            attempt,
            delay_ms,
            error = %error
        );
        self.transition(PoolState::Backoff { attempt, delay_ms }, 0)
            .await;

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
            // A resize retries immediately with the new size.
            changed = target.changed() => changed.is_ok(),
        }
    }

    async fn transition(&self, state: PoolState, running: usize) {
        {
            let mut status = self.status.lock();
            status.state = state;
            status.running = running;
        }
        POOL_CONSUMERS
            .with_label_values(&[self.queue_name.as_str()])
            .set(running as i64);
        self.publisher
            .publish(PipelineEvent::PoolStateChanged {
                queue: self.queue_name.to_string(),
                state: state.as_str().to_string(),
                consumers: running,
            })
            .await;
    }
}
