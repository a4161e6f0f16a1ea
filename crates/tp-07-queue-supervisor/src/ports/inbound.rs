use crate::domain::{BackpressureSignal, PoolStatus, SupervisorError};
use async_trait::async_trait;
use tokio::sync::watch;
use tp_06_vote_consumer::QueueName;

/// Control surface used by the worker runtime and operators.
#[async_trait]
pub trait QueueSupervisorApi: Send + Sync {
    /// Spawn every configured pool and the depth monitor.
    fn start(&self) -> Result<(), SupervisorError>;

    /// Change a pool's size. The pool drains its current consumers and
    /// starts `consumers` new ones; 0 disables it.
    fn resize(&self, queue: QueueName, consumers: usize) -> Result<(), SupervisorError>;

    fn status(&self) -> Vec<PoolStatus>;

    fn pool_status(&self, queue: QueueName) -> PoolStatus;

    /// Receiver that tracks `queue`'s backpressure signal.
    fn backpressure(&self, queue: QueueName) -> watch::Receiver<BackpressureSignal>;

    /// Sample every queue's depth once, updating gauges and signals.
    async fn monitor_once(&self);

    /// Stop all pools, letting in-flight deliveries settle first.
    async fn shutdown(&self);
}
