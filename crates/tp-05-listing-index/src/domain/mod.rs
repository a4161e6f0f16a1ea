//! Listing index domain.

pub mod config;
pub mod cursor;
pub mod debounce;
pub mod errors;
pub mod listing;
pub mod merge;

pub use config::ListingConfig;
pub use cursor::Cursor;
pub use debounce::{DebounceTracker, Trigger};
pub use errors::ListingError;
pub use listing::{Candidate, Listing, ListingKey, ListingPage, SweepReport};
pub use merge::top_n;
