//! # Shared Bus - Pipeline Event Bus
//!
//! In-process broadcast bus on which every pipeline stage announces what it
//! just did. Stages never call each other through the bus; the queue and the
//! direct fan-out in the vote consumer drive the work. Subscribers are
//! observers: metrics exporters, operator alerting, tests.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Vote Ledger  │                    │  Observer    │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Critical events (quarantined aggregates, pool failures) go to the
//! [`EventTopic::DeadLetterQueue`] topic.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{Component, EventFilter, EventTopic, PipelineEvent, TreePass};
pub use publisher::{EventPublisher, InMemoryEventBus, NoopPublisher};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
