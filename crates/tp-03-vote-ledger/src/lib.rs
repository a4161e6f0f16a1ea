//! # TP-03 Vote Ledger
//!
//! Applies votes to item aggregates with exactly-once effect.
//!
//! ## Idempotency
//!
//! The ledger stores the last direction of every `(voter, item)` pair. A vote
//! whose direction equals the stored one is a no-op, so a redelivered queue
//! message changes nothing. The comparison and the write happen under the
//! item's RecomputeLock; the vote record and the new aggregate are written in
//! one atomic batch.
//!
//! ## Apply Flow
//!
//! ```text
//! vote ──► quarantined? ──yes──► Err(Quarantined)
//!            │ no
//!            ▼
//!      ItemDirectory::item_info ──none──► Err(ItemNotFound)
//!            │
//!            ▼
//!      lock:agg:{item} ──► stored direction == new? ──yes──► NoOp
//!            │ no
//!            ▼
//!      load + verify aggregate ──bad──► quarantine, Err(CorruptAggregate)
//!            │
//!            ▼
//!      recompute ranks ──► batch{vote:, agg:} ──► Applied{old, new, previous}
//! ```
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): outcome, config, errors, persisted records
//! - **Ports Layer** (`ports/`): `VoteLedgerApi`, `ItemDirectory`
//! - **Adapters Layer** (`adapters/`): in-memory item directory
//! - **Service Layer** (`service/`): `VoteLedger`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryItemDirectory;
pub use domain::*;
pub use ports::{ItemDirectory, VoteLedgerApi};
pub use service::{LedgerDependencies, LedgerStats, LedgerStatsSnapshot, VoteLedger};
