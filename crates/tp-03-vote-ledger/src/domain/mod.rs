//! Vote ledger domain.

pub mod config;
pub mod errors;
pub mod outcome;
pub mod record;

pub use config::LedgerConfig;
pub use errors::LedgerError;
pub use outcome::LedgerOutcome;
pub use record::{decode_aggregate, encode_aggregate, StoredVote};
