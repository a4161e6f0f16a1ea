use super::backpressure::BackpressureSignal;
use tp_06_vote_consumer::{DeliveryStatsSnapshot, QueueName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Configured but not started yet.
    Idle,
    Running,
    /// Zero consumers configured.
    Disabled,
    /// Waiting to retry after the queue became unavailable.
    Backoff { attempt: u32, delay_ms: u64 },
    Stopped,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Disabled => "disabled",
            Self::Backoff { .. } => "backoff",
            Self::Stopped => "stopped",
        }
    }
}

/// Point-in-time view of one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub queue: QueueName,
    pub state: PoolState,
    /// Configured pool size.
    pub target: usize,
    /// Consumers currently spawned.
    pub running: usize,
    pub restarts: u64,
    pub last_error: Option<String>,
    /// Last sampled depth; `None` until the monitor reached the queue.
    pub depth: Option<usize>,
    pub backpressure: BackpressureSignal,
    pub deliveries: DeliveryStatsSnapshot,
}

impl PoolStatus {
    pub fn new(queue: QueueName, target: usize) -> Self {
        Self {
            queue,
            state: PoolState::Idle,
            target,
            running: 0,
            restarts: 0,
            last_error: None,
            depth: None,
            backpressure: BackpressureSignal::Clear,
            deliveries: DeliveryStatsSnapshot::default(),
        }
    }
}
