//! # TP-04 Comment-Tree Maintainer
//!
//! Keeps one ordered tree per discussion root, persisted under `tree:{root}`.
//!
//! ## Per-root State Machine
//!
//! ```text
//!            structural                      ┌─────────────┐
//!   Clean ─────────────► Dirty(structural) ─►│ Rebuilding  │─┐
//!     ▲  │                                   └─────────────┘ │
//!     │  │ vote only                         ┌─────────────┐ │
//!     │  └─────────────► Dirty(rank-only) ──►│ Resorting   │─┤
//!     │                                      └─────────────┘ │
//!     └──────────────── no pending signal ◄──────────────────┘
//! ```
//!
//! Signals that arrive while a pass runs coalesce into at most one more pass.
//! Structural dominates rank-only; rank-only sets of affected comments merge.
//!
//! ## Passes
//!
//! | Pass | Trigger | Work |
//! |------|---------|------|
//! | Rebuild | new or removed comment | full relink from the comment list and current aggregates |
//! | Resort | vote on a comment | re-read sibling ranks, re-sort those siblings, adjust `subtree_vote_sum` on the ancestor path |
//!
//! Both passes run under the per-root RecomputeLock.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `CommentTree`, tree queries, state machine
//! - **Ports Layer** (`ports/`): `CommentTreeApi`, `CommentSource`, `RankSource`
//! - **Adapters Layer** (`adapters/`): in-memory sources
//! - **Service Layer** (`service/`): `CommentTreeMaintainer`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryCommentSource, InMemoryRankSource};
pub use domain::*;
pub use ports::{CommentSource, CommentTreeApi, RankSource};
pub use service::{CommentTreeMaintainer, TreeDependencies, TreeStats, TreeStatsSnapshot};
