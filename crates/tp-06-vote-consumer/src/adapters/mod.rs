pub mod memory_queue;

pub use memory_queue::{DeadLetter, InMemoryQueue};
