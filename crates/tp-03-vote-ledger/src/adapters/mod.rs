pub mod memory_directory;

pub use memory_directory::InMemoryItemDirectory;
