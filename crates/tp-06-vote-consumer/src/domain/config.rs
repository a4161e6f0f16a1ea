use shared_types::BackoffPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfig {
    /// Longest a consumer blocks on an empty queue before checking for
    /// shutdown.
    pub dequeue_timeout_ms: u64,
    /// Attempt from which a delivery that keeps failing transiently is
    /// reported at warn level. It is still retried. 0 never reports.
    pub max_attempts: u32,
    /// Redelivery delay for transient failures.
    pub retry: BackoffPolicy,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout_ms: 1_000,
            max_attempts: 25,
            retry: BackoffPolicy {
                base_ms: 100,
                max_ms: 10_000,
                ..BackoffPolicy::default()
            },
        }
    }
}

impl ConsumerConfig {
    pub fn for_testing() -> Self {
        Self {
            dequeue_timeout_ms: 50,
            max_attempts: 5,
            retry: BackoffPolicy::for_testing(),
        }
    }

    /// Whether a delivery on its `attempt`-th try has been failing long
    /// enough to be reported.
    pub fn overdue(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }

    /// How long a delivery that failed on its `attempt`-th try waits before
    /// it is handed out again.
    pub fn redelivery_delay(&self, attempt: u32) -> std::time::Duration {
        self.retry.next_delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_redelivery_backs_off() {
        let config = ConsumerConfig::for_testing();
        assert_eq!(config.redelivery_delay(1), Duration::from_millis(10));
        assert_eq!(config.redelivery_delay(2), Duration::from_millis(20));
        assert_eq!(config.redelivery_delay(9), Duration::from_millis(40));
    }

    #[test]
    fn test_zero_budget_never_overdue() {
        let config = ConsumerConfig {
            max_attempts: 0,
            ..ConsumerConfig::for_testing()
        };
        assert!(!config.overdue(1_000));
        assert!(ConsumerConfig::for_testing().overdue(5));
    }
}
