pub mod inbound;
pub mod outbound;

pub use inbound::ListingApi;
pub use outbound::CandidateSource;
