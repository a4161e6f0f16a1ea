pub mod inbound;
pub mod outbound;

pub use inbound::VoteLedgerApi;
pub use outbound::ItemDirectory;
