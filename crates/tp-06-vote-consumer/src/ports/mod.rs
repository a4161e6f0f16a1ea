pub mod inbound;
pub mod outbound;

pub use inbound::MessageHandler;
pub use outbound::{Delivery, MessageQueue};
