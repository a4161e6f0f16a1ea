use crate::domain::Candidate;
use async_trait::async_trait;
use shared_types::{ContainerId, StoreError, Timestamp};

/// Items eligible for a container's listings.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Links of `container_id` created at or after `since`, with their
    /// current aggregates.
    async fn candidates(&self, container_id: ContainerId, since: Timestamp) -> Result<Vec<Candidate>, StoreError>;
}
