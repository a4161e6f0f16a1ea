//! Structured logging macros.
//!
//! Every pipeline log line carries a `component` field plus the identifiers
//! of the object it is about, so JSON logs can be filtered per item, key or
//! queue without parsing messages:
//!
//! | Macro | Standard fields |
//! |-------|-----------------|
//! | `log_event!` | `component` |
//! | `log_vote_event!` | `component`, `item_id`, `voter_id` |
//! | `log_cache_event!` | `component`, `key` |
//! | `log_queue_event!` | `component`, `queue` |

/// Log with a component field.
#[macro_export]
macro_rules! log_event {
    ($level:ident, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a vote-related event with standard fields.
#[macro_export]
macro_rules! log_vote_event {
    ($level:ident, $component:expr, $msg:expr, $item_id:expr, $voter_id:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            component = $component,
            item_id = %$item_id,
            voter_id = %$voter_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a cache-related event with standard fields.
#[macro_export]
macro_rules! log_cache_event {
    ($level:ident, $component:expr, $msg:expr, $key:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            component = $component,
            key = %$key,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a queue-related event with standard fields.
#[macro_export]
macro_rules! log_queue_event {
    ($level:ident, $component:expr, $msg:expr, $queue:expr $(, $($field:tt)*)?) => {
        $crate::tracing::$level!(
            component = $component,
            queue = %$queue,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand_without_subscriber() {
        let item = 42u64;
        let voter = 7u64;
        crate::log_event!(info, "runtime", "started", workers = 3);
        crate::log_vote_event!(debug, "vote_consumer", "vote applied", item, voter, score = 1);
        crate::log_cache_event!(warn, "cache_tier", "invalidated", "frag:item:42");
        crate::log_queue_event!(error, "queue_supervisor", "pool stopped", "votes.link");
    }
}
