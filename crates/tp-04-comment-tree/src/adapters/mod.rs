pub mod memory;

pub use memory::{InMemoryCommentSource, InMemoryRankSource};
