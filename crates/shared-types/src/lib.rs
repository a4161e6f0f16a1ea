//! # Shared Types Crate
//!
//! Domain entities, the persisted key layout, the queue delivery envelope and
//! the error classification shared by every pipeline subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Types that cross a subsystem boundary are defined here.
//! - **Stable Keys**: All store keys come from [`keys`]; no subsystem formats its own.
//! - **Uniform Failure Handling**: Subsystem errors implement [`Classify`] so
//!   the consumer loop can decide between retry, dead-letter and quarantine
//!   without knowing the concrete error type.

pub mod backoff;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod keys;
pub mod time;

pub use backoff::BackoffPolicy;
pub use entities::*;
pub use envelope::QueueEnvelope;
pub use errors::*;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
