pub mod config;
pub mod disposition;
pub mod errors;
pub mod message;
pub mod queues;

pub use config::ConsumerConfig;
pub use disposition::Disposition;
pub use errors::{ConsumerError, QueueError};
pub use message::QueueMessage;
pub use queues::QueueName;
