//! # Inbound Port - MessageHandler
//!
//! What a consumer loop calls for each delivery. Handlers never fail: every
//! error is folded into the returned [`Disposition`].

use crate::domain::Disposition;
use crate::ports::Delivery;
use async_trait::async_trait;

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> Disposition;
}
