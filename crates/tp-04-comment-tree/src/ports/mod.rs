pub mod inbound;
pub mod outbound;

pub use inbound::CommentTreeApi;
pub use outbound::{CommentSource, RankSource};
