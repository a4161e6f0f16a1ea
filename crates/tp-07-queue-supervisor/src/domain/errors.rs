use shared_types::{Classify, ErrorClass};
use thiserror::Error;
use tp_06_vote_consumer::QueueName;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("supervisor already started")]
    AlreadyStarted,

    #[error("supervisor not running")]
    NotRunning,

    #[error("{requested} consumers requested for {queue}, limit is {limit}")]
    ConsumerLimit {
        queue: QueueName,
        requested: usize,
        limit: usize,
    },
}

impl Classify for SupervisorError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyStarted | Self::ConsumerLimit { .. } => ErrorClass::Malformed,
            Self::NotRunning => ErrorClass::QueueUnavailable,
        }
    }
}
