pub mod memory;

pub use memory::InMemoryCandidateSource;
