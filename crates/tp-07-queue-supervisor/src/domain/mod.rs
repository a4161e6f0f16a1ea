pub mod backpressure;
pub mod config;
pub mod errors;
pub mod status;

pub use shared_types::BackoffPolicy;
pub use backpressure::{BackpressureGauge, BackpressureSignal};
pub use config::{QueueConfig, SupervisorConfig};
pub use errors::SupervisorError;
pub use status::{PoolState, PoolStatus};
