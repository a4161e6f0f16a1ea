//! # Bridging Adapters
//!
//! Outbound ports of one stage implemented on top of another stage:
//!
//! | Port | Implemented by | Backed by |
//! |------|----------------|-----------|
//! | `tp_04::RankSource` | [`LedgerRankSource`] | vote ledger aggregates |
//! | `tp_04::CommentSource` | [`DirectoryCommentSource`] | item directory |
//! | `tp_05::CandidateSource` | [`DirectoryCandidateSource`] | item directory + vote ledger |

mod directory;
mod ranks;

pub use directory::{DirectoryCandidateSource, DirectoryCommentSource};
pub use ranks::LedgerRankSource;

use shared_types::StoreError;
use tp_03_vote_ledger::LedgerError;

/// Ledger failures seen through a store-shaped port.
pub(crate) fn ledger_to_store(error: LedgerError) -> StoreError {
    match error {
        LedgerError::Store(inner) => inner,
        other => StoreError::Unavailable(other.to_string()),
    }
}
