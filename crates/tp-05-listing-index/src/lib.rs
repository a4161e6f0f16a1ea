//! # TP-05 Listing Index
//!
//! One ranked listing per `(container, sort, window)`, persisted under
//! `listing:{container}:{sort}:{window}`.
//!
//! ## Rebuilds
//!
//! A rebuild is a bounded top-N merge over the candidates of the container
//! created inside the window. Every rebuild bumps the listing's generation.
//!
//! | Trigger | Path |
//! |---------|------|
//! | Invalidation | rebuilt now, or marked pending if the key was rebuilt less than `debounce_ms` ago |
//! | `flush_pending` | pending keys whose debounce interval has elapsed |
//! | `sweep` | every known key, subject to the same debounce |
//! | First read | a missing listing is built on demand |
//!
//! ## Cursors
//!
//! Page cursors are hex strings embedding `(generation, offset)`. A cursor
//! too many generations behind, undecodable, or past the end restarts the
//! reader at a fresh first page (`restarted = true`).
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): listing, cursor, top-N merge, debounce
//! - **Ports Layer** (`ports/`): `ListingApi`, `CandidateSource`
//! - **Adapters Layer** (`adapters/`): in-memory candidate source
//! - **Service Layer** (`service/`): `ListingIndex`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryCandidateSource;
pub use domain::*;
pub use ports::{CandidateSource, ListingApi};
pub use service::{ListingDependencies, ListingIndex, ListingStats, ListingStatsSnapshot};
