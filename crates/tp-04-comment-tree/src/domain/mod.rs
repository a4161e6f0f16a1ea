//! Comment tree domain.

pub mod config;
pub mod errors;
pub mod state;
pub mod tree;

pub use config::TreeConfig;
pub use errors::TreeError;
pub use state::{DirtyKind, RootTracker, Signal, TreeState};
pub use tree::{CommentNode, CommentTree, NodeRank, TreeDetails};
