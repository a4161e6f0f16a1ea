//! # Tippr Test Suite
//!
//! Cross-crate flows through a fully wired [`worker_runtime::PipelineContainer`]
//! backed by in-memory adapters.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs      # Pipeline harness and item builders
//!     ├── vote_flow.rs     # ledger + consumer fan-out
//!     ├── tree_flow.rs     # comment-tree maintenance
//!     ├── listing_flow.rs  # listing generations, cursors, debounce
//!     ├── cache_flow.rs    # fragments around votes
//!     └── queue_flow.rs    # queue → supervisor → consumer → stages
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tp-tests
//! cargo test -p tp-tests integration::tree_flow
//!
//! # Benchmarks
//! cargo bench -p tp-tests
//! ```

pub mod integration;
