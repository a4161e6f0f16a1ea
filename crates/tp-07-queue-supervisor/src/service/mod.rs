//! # Queue Supervisor Service
//!
//! Holds one pool slot per queue: the watch channel carrying its target
//! size, its shared status, its delivery counters and its backpressure
//! gauge. `start` hands each slot to a [`pool::PoolRunner`] task and spawns
//! the depth monitor.

mod pool;
mod stats;

pub use stats::{SupervisorStats, SupervisorStatsSnapshot};

use crate::domain::{
    BackpressureGauge, BackpressureSignal, PoolStatus, SupervisorConfig, SupervisorError,
};
use crate::ports::QueueSupervisorApi;
use async_trait::async_trait;
use parking_lot::Mutex;
use pool::{PoolRunner, COMPONENT};
use shared_bus::EventPublisher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tippr_telemetry::log_queue_event;
use tippr_telemetry::metrics::{DELIVERIES, QUEUE_DEPTH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tp_06_vote_consumer::{DeliveryStats, MessageHandler, MessageQueue, QueueName};
use tracing::{debug, info, warn};

pub struct SupervisorDependencies {
    pub queue: Arc<dyn MessageQueue>,
    /// Shared by every consumer of every pool.
    pub handler: Arc<dyn MessageHandler>,
    pub publisher: Arc<dyn EventPublisher>,
}

struct PoolSlot {
    queue: QueueName,
    target: watch::Sender<usize>,
    status: Arc<Mutex<PoolStatus>>,
    deliveries: Arc<DeliveryStats>,
    gauge: Mutex<BackpressureGauge>,
    signal: watch::Sender<BackpressureSignal>,
}

struct Shared {
    deps: SupervisorDependencies,
    config: SupervisorConfig,
    /// Indexed by [`QueueName::index`].
    pools: Vec<PoolSlot>,
    stats: Arc<SupervisorStats>,
}

impl Shared {
    fn slot(&self, queue: QueueName) -> &PoolSlot {
        &self.pools[queue.index()]
    }

    async fn monitor_once(&self) {
        for slot in &self.pools {
            let name = slot.queue.as_str();
            let depth = self.deps.queue.depth(name).await;
            let deliveries = slot.deliveries.snapshot();
            DELIVERIES
                .with_label_values(&[name, "acked"])
                .set(deliveries.acked as i64);
            DELIVERIES
                .with_label_values(&[name, "nacked"])
                .set(deliveries.requeued as i64);
            DELIVERIES
                .with_label_values(&[name, "dead_lettered"])
                .set(deliveries.dead_lettered as i64);

            let depth = match depth {
                Ok(depth) => depth,
                Err(e) => {
                    debug!(queue = name, error = %e, "Depth check failed");
                    slot.status.lock().deliveries = deliveries;
                    continue;
                }
            };
            QUEUE_DEPTH.with_label_values(&[name]).set(depth as i64);

            let (changed, signal) = {
                let mut gauge = slot.gauge.lock();
                (gauge.observe(depth), gauge.signal())
            };
            if let Some(signal) = changed {
                slot.signal.send_replace(signal);
                if signal.is_engaged() {
                    SupervisorStats::incr(&self.stats.backpressure_engaged);
                    log_queue_event!(warn, COMPONENT, "Backpressure engaged", name, depth);
                } else {
                    log_queue_event!(info, COMPONENT, "Backpressure cleared", name, depth);
                }
            }

            let mut status = slot.status.lock();
            status.depth = Some(depth);
            status.backpressure = signal;
            status.deliveries = deliveries;
        }
        SupervisorStats::incr(&self.stats.monitor_passes);
    }
}

async fn monitor_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_millis(shared.config.monitor_interval_ms.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => shared.monitor_once().await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("Queue monitor stopped");
}

pub struct QueueSupervisor {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl QueueSupervisor {
    pub fn new(deps: SupervisorDependencies, config: SupervisorConfig) -> Self {
        let pools = QueueName::ALL
            .into_iter()
            .map(|queue| {
                let target = config.queue(queue).consumers;
                PoolSlot {
                    queue,
                    target: watch::Sender::new(target),
                    status: Arc::new(Mutex::new(PoolStatus::new(queue, target))),
                    deliveries: Arc::new(DeliveryStats::default()),
                    gauge: Mutex::new(BackpressureGauge::new(config.high_water, config.low_water)),
                    signal: watch::Sender::new(BackpressureSignal::Clear),
                }
            })
            .collect();
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                deps,
                config,
                pools,
                stats: Arc::new(SupervisorStats::default()),
            }),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> SupervisorStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Delivery counters shared by `queue`'s consumers.
    pub fn delivery_stats(&self, queue: QueueName) -> Arc<DeliveryStats> {
        Arc::clone(&self.shared.slot(queue).deliveries)
    }

    fn stopping(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

#[async_trait]
impl QueueSupervisorApi for QueueSupervisor {
    fn start(&self) -> Result<(), SupervisorError> {
        if self.stopping() {
            return Err(SupervisorError::NotRunning);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SupervisorError::AlreadyStarted);
        }

        let shared = &self.shared;
        let mut tasks = self.tasks.lock();
        for slot in &shared.pools {
            let queue_config = shared.config.queue(slot.queue);
            let runner = PoolRunner {
                queue_name: slot.queue,
                queue: Arc::clone(&shared.deps.queue),
                handler: Arc::clone(&shared.deps.handler),
                publisher: Arc::clone(&shared.deps.publisher),
                consumer: queue_config.consumer_config(),
                backoff: shared.config.backoff,
                grace: Duration::from_millis(shared.config.shutdown_grace_ms),
                status: Arc::clone(&slot.status),
                deliveries: Arc::clone(&slot.deliveries),
                stats: Arc::clone(&shared.stats),
            };
            tasks.push(tokio::spawn(
                runner.run(slot.target.subscribe(), self.shutdown_tx.subscribe()),
            ));
        }
        tasks.push(tokio::spawn(monitor_loop(
            Arc::clone(shared),
            self.shutdown_tx.subscribe(),
        )));

        info!(
            consumers = shared.config.total_consumers(),
            queues = shared.pools.len(),
            "Queue supervisor started"
        );
        Ok(())
    }

    fn resize(&self, queue: QueueName, consumers: usize) -> Result<(), SupervisorError> {
        if self.stopping() {
            return Err(SupervisorError::NotRunning);
        }
        let limit = self.shared.config.max_consumers_per_queue;
        if consumers > limit {
            return Err(SupervisorError::ConsumerLimit {
                queue,
                requested: consumers,
                limit,
            });
        }

        let slot = self.shared.slot(queue);
        let previous = slot.target.send_replace(consumers);
        slot.status.lock().target = consumers;
        log_queue_event!(info, COMPONENT, "Pool resized", queue, previous, consumers);
        Ok(())
    }

    fn status(&self) -> Vec<PoolStatus> {
        QueueName::ALL
            .into_iter()
            .map(|queue| self.pool_status(queue))
            .collect()
    }

    fn pool_status(&self, queue: QueueName) -> PoolStatus {
        let slot = self.shared.slot(queue);
        let mut status = slot.status.lock().clone();
        status.deliveries = slot.deliveries.snapshot();
        status
    }

    fn backpressure(&self, queue: QueueName) -> watch::Receiver<BackpressureSignal> {
        self.shared.slot(queue).signal.subscribe()
    }

    async fn monitor_once(&self) {
        self.shared.monitor_once().await;
    }

    async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Supervisor task failed during shutdown");
            }
        }
        info!("Queue supervisor stopped");
    }
}
