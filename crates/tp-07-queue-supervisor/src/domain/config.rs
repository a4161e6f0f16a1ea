use shared_types::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tp_06_vote_consumer::{ConsumerConfig, QueueName};

/// Pool settings of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Concurrent consumers. 0 disables the queue.
    pub consumers: usize,
    pub dequeue_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        let consumer = ConsumerConfig::default();
        Self {
            consumers: 1,
            dequeue_timeout_ms: consumer.dequeue_timeout_ms,
        }
    }
}

impl QueueConfig {
    pub fn with_consumers(consumers: usize) -> Self {
        Self {
            consumers,
            ..Self::default()
        }
    }

    pub fn enabled(&self) -> bool {
        self.consumers > 0
    }

    /// Loop settings for this queue's consumers. The retry budget belongs
    /// to the handler, so only the dequeue timeout comes from here.
    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            dequeue_timeout_ms: self.dequeue_timeout_ms,
            ..ConsumerConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Queues missing here get a disabled pool.
    pub queues: BTreeMap<QueueName, QueueConfig>,
    pub backoff: BackoffPolicy,
    /// Depth at which a queue's backpressure engages. 0 disables it.
    pub high_water: usize,
    pub low_water: usize,
    pub monitor_interval_ms: u64,
    /// How long stopping consumers may take to settle their in-flight
    /// delivery before they are aborted.
    pub shutdown_grace_ms: u64,
    pub max_consumers_per_queue: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        let queues = [
            (QueueName::VotesLink, 4),
            (QueueName::VotesComment, 2),
            (QueueName::TreeRebuild, 1),
            (QueueName::ListingRebuild, 1),
        ]
        .into_iter()
        .map(|(queue, consumers)| (queue, QueueConfig::with_consumers(consumers)))
        .collect();

        Self {
            queues,
            backoff: BackoffPolicy::default(),
            high_water: 10_000,
            low_water: 2_000,
            monitor_interval_ms: 5_000,
            shutdown_grace_ms: 10_000,
            max_consumers_per_queue: 64,
        }
    }
}

impl SupervisorConfig {
    pub fn for_testing() -> Self {
        let queues = QueueName::ALL
            .iter()
            .map(|queue| {
                let config = QueueConfig {
                    consumers: 1,
                    dequeue_timeout_ms: ConsumerConfig::for_testing().dequeue_timeout_ms,
                };
                (*queue, config)
            })
            .collect();

        Self {
            queues,
            backoff: BackoffPolicy::for_testing(),
            high_water: 10,
            low_water: 2,
            monitor_interval_ms: 20,
            shutdown_grace_ms: 500,
            max_consumers_per_queue: 8,
        }
    }

    /// Settings for `queue`, disabled when it is not configured.
    pub fn queue(&self, queue: QueueName) -> QueueConfig {
        self.queues
            .get(&queue)
            .cloned()
            .unwrap_or_else(|| QueueConfig::with_consumers(0))
    }

    pub fn set_consumers(&mut self, queue: QueueName, consumers: usize) {
        self.queues.entry(queue).or_default().consumers = consumers;
    }

    /// Total consumers across enabled queues.
    pub fn total_consumers(&self) -> usize {
        self.queues.values().map(|q| q.consumers).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_sizes() {
        let config = SupervisorConfig::default();
        assert_eq!(config.queue(QueueName::VotesLink).consumers, 4);
        assert_eq!(config.queue(QueueName::VotesComment).consumers, 2);
        assert_eq!(config.total_consumers(), 8);
    }

    #[test]
    fn test_missing_queue_is_disabled() {
        let mut config = SupervisorConfig::default();
        config.queues.remove(&QueueName::TreeRebuild);
        assert!(!config.queue(QueueName::TreeRebuild).enabled());
    }

    #[test]
    fn test_json_uses_queue_names() {
        let config: SupervisorConfig = serde_json::from_str(
            r#"{"queues": {"votes.link": {"consumers": 0}, "maintenance.tree_rebuild": {"consumers": 3}}}"#,
        )
        .unwrap();
        assert!(!config.queue(QueueName::VotesLink).enabled());
        assert_eq!(config.queue(QueueName::TreeRebuild).consumers, 3);
        assert_eq!(config.queue(QueueName::TreeRebuild).dequeue_timeout_ms, 1_000);
        assert!(!config.queue(QueueName::VotesComment).enabled());
        assert_eq!(config.high_water, 10_000);
    }

    #[test]
    fn test_set_consumers_adds_queue() {
        let mut config = SupervisorConfig::default();
        config.queues.clear();
        config.set_consumers(QueueName::ListingRebuild, 2);
        assert_eq!(config.queue(QueueName::ListingRebuild).consumers, 2);
        assert_eq!(
            config.queue(QueueName::ListingRebuild).consumer_config(),
            ConsumerConfig::default()
        );
    }
}
