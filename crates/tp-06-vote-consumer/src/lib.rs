//! # TP-06 Vote Consumer Pool
//!
//! Drains the inbound queues and dispatches every delivery to the pipeline
//! stage that owns it.
//!
//! ## Delivery Flow
//!
//! ```text
//! MessageQueue ──dequeue──→ ConsumerLoop ──handle──→ VoteConsumer
//!      ↑                        │                        │
//!      └──ack / nack / DLQ──────┘                        ├─ Vote ──→ VoteLedger ──(applied)──→ fan-out
//!                                                        ├─ TreeRebuild ──→ CommentTreeMaintainer
//!                                                        ├─ ListingRebuild ──→ ListingIndex (debounced)
//!                                                        └─ ListingSweep ──→ ListingIndex::sweep
//! ```
//!
//! ## Fan-out after an applied vote
//!
//! 1. Comment votes notify the comment-tree maintainer of their root.
//! 2. Vote-sensitive listings of the container are invalidated.
//! 3. Fragment keys of the item, its listings and its tree are marked stale.
//!
//! Fan-out failures are logged and the delivery is still acknowledged: the
//! ledger write is durable, invalidation is idempotent and the periodic
//! sweep repairs listings.
//!
//! ## Acknowledgement
//!
//! | Outcome | Disposition |
//! |---------|-------------|
//! | Applied / NoOp | ack |
//! | Transient store error, lock contention | nack + requeue |
//! | Malformed message, unknown item | dead-letter |
//! | Corrupt aggregate | ack (key quarantined, critical event published) |

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DeadLetter, InMemoryQueue};
pub use domain::*;
pub use ports::{Delivery, MessageHandler, MessageQueue};
pub use service::{
    ConsumerDependencies, ConsumerLoop, ConsumerStats, ConsumerStatsSnapshot, DeliveryStats,
    DeliveryStatsSnapshot, FanOutReport, LoopExit, VoteConsumer,
};
