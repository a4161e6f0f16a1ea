//! Cache tier services.

pub mod durable;
pub mod manager;
pub mod metrics;
pub mod page;

pub use durable::{call_to_completion, call_with_deadline, DurableTier};
pub use manager::{CacheManager, PurgeReport};
pub use metrics::{CacheMetrics, CacheStats};
pub use page::{AssembledPage, FragmentRenderer, PageAssembler, Slot};
