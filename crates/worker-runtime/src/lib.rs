//! # Tippr Worker Runtime
//!
//! Assembles the vote pipeline into one process:
//!
//! ```text
//!            ┌──────────────────────── QueueSupervisor ────────────────────────┐
//! queue ───→ │ votes.link  votes.comment  maintenance.tree  maintenance.listing │
//!            └────────────────────────────┬────────────────────────────────────┘
//!                                         ↓
//!                                    VoteConsumer
//!                 ┌─────────────┬─────────┴──────┬──────────────┐
//!                 ↓             ↓                ↓              ↓
//!            VoteLedger   CommentTree     ListingIndex    CacheManager
//!                 └─────────────┴───── event bus ┴──────────────┘
//!                                         ↓
//!                              event bridge → Prometheus
//! ```
//!
//! ## Modules
//!
//! - `config` - layered configuration (defaults, file, environment)
//! - `cli` - command-line flags
//! - `container` - stage construction and wiring
//! - `adapters` - stage-to-stage port implementations
//! - `maintenance` - periodic flush, sweep, purge and stats
//! - `events` - bus events to metrics
//! - `metrics_server` - `/metrics` and `/healthz`
//! - `runtime` - start and graceful shutdown

pub mod adapters;
pub mod cli;
pub mod config;
pub mod container;
pub mod events;
pub mod maintenance;
pub mod metrics_server;
pub mod runtime;

pub use config::{ConfigError, MaintenanceConfig, RuntimeConfig, StorageBackend, StorageConfig};
pub use container::{Backends, ContainerError, PipelineContainer};
pub use maintenance::{Maintenance, PurgeSummary};
pub use runtime::{RuntimeError, WorkerRuntime};
