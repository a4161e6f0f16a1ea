pub mod inbound;

pub use inbound::RankingApi;
