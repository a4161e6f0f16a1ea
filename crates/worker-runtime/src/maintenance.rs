//! # Periodic Maintenance
//!
//! Background work the queue does not drive:
//!
//! | Task | Default period | What it does |
//! |------|----------------|--------------|
//! | `flush_pending` | 1s | rebuild listings whose debounce window has passed |
//! | `sweep` | 5min | rebuild every known listing, catching missed triggers |
//! | `purge` | 1min | drop expired cache entries, locks and durable fragments |
//! | `retry_trees` | 30s | drive comment trees parked after failed passes |
//! | `mirror_stats` | 10s | copy cache counters into Prometheus gauges |
//!
//! Every task runs on its own interval and stops when the shutdown channel
//! flips to `true`.

use crate::config::MaintenanceConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tippr_telemetry::metrics::{
    CACHE_ENTRIES, CACHE_STATS, LISTING_SWEEP_DURATION, MAINTENANCE_DURATION,
};
use tippr_telemetry::{log_event, time_histogram};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tp_01_cache_tier::CacheManager;
use tp_04_comment_tree::CommentTreeApi;
use tp_05_listing_index::{ListingApi, SweepReport};

const COMPONENT: &str = "maintenance";

/// Totals of one purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub volatile: usize,
    pub stale: usize,
    pub locks: usize,
    pub durable: usize,
}

impl PurgeSummary {
    pub fn total(&self) -> usize {
        self.volatile + self.stale + self.locks + self.durable
    }
}

pub struct Maintenance {
    listings: Arc<dyn ListingApi>,
    trees: Arc<dyn CommentTreeApi>,
    cache: Arc<CacheManager>,
    config: MaintenanceConfig,
}

impl Maintenance {
    pub fn new(
        listings: Arc<dyn ListingApi>,
        trees: Arc<dyn CommentTreeApi>,
        cache: Arc<CacheManager>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            listings,
            trees,
            cache,
            config,
        }
    }

    pub async fn retry_trees(&self) -> usize {
        let recovered = self.trees.retry_parked().await;
        if recovered > 0 {
            log_event!(info, COMPONENT, "Retried parked comment trees", recovered = recovered);
        }
        recovered
    }

    pub async fn flush_pending(&self) -> SweepReport {
        let _timer = time_histogram!(MAINTENANCE_DURATION.with_label_values(&["flush_pending"]));
        let report = self.listings.flush_pending().await;
        if report.rebuilt > 0 || report.failed > 0 {
            log_event!(
                debug,
                COMPONENT,
                "Flushed pending listings",
                rebuilt = report.rebuilt,
                deferred = report.deferred,
                failed = report.failed
            );
        }
        report
    }

    pub async fn sweep(&self) -> SweepReport {
        let _timer = time_histogram!(LISTING_SWEEP_DURATION);
        let report = self.listings.sweep().await;
        log_event!(
            info,
            COMPONENT,
            "Listing sweep finished",
            rebuilt = report.rebuilt,
            failed = report.failed
        );
        report
    }

    /// Expired in-memory entries and locks, then durable records under each
    /// configured prefix. A failing prefix is logged and skipped.
    pub async fn purge(&self) -> PurgeSummary {
        let _timer = time_histogram!(MAINTENANCE_DURATION.with_label_values(&["purge"]));
        let report = self.cache.purge_expired();
        let mut summary = PurgeSummary {
            volatile: report.volatile,
            stale: report.stale,
            locks: report.locks,
            durable: 0,
        };

        for prefix in &self.config.durable_purge_prefixes {
            match self.cache.purge_durable(prefix).await {
                Ok(removed) => summary.durable += removed,
                Err(e) => {
                    log_event!(warn, COMPONENT, "Durable purge failed", prefix = %prefix, error = %e);
                }
            }
        }

        if summary.total() > 0 {
            log_event!(
                debug,
                COMPONENT,
                "Purged expired entries",
                volatile = summary.volatile,
                stale = summary.stale,
                locks = summary.locks,
                durable = summary.durable
            );
        }
        summary
    }

    pub fn mirror_stats(&self) {
        let stats = self.cache.stats();
        let counters = [
            ("volatile_hit", stats.volatile_hits),
            ("durable_hit", stats.durable_hits),
            ("miss", stats.misses),
            ("stale", stats.stale_serves),
            ("placeholder", stats.placeholders),
            ("compute", stats.computes),
            ("compute_failure", stats.compute_failures),
            ("lock_contention", stats.lock_contention),
            ("lock_wait_timeout", stats.lock_wait_timeouts),
            ("invalidation", stats.invalidations),
            ("durable_error", stats.durable_errors),
            ("eviction", stats.volatile.evictions + stats.stale.evictions),
        ];
        for (event, value) in counters {
            CACHE_STATS.with_label_values(&[event]).set(gauge(value));
        }
        CACHE_ENTRIES
            .with_label_values(&["volatile"])
            .set(gauge(stats.volatile.entries as u64));
        CACHE_ENTRIES
            .with_label_values(&["stale"])
            .set(gauge(stats.stale.entries as u64));
        CACHE_ENTRIES
            .with_label_values(&["locks"])
            .set(gauge(stats.locks_held as u64));
    }

    /// Start one interval task per maintenance job.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let config = self.config.clone();
        let mut tasks = Vec::with_capacity(5);

        let this = Arc::clone(&self);
        tasks.push(spawn_periodic(
            "flush_pending",
            config.flush_interval_ms,
            shutdown.clone(),
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.flush_pending().await;
                }
            },
        ));

        let this = Arc::clone(&self);
        tasks.push(spawn_periodic(
            "sweep",
            config.sweep_interval_ms,
            shutdown.clone(),
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.sweep().await;
                }
            },
        ));

        let this = Arc::clone(&self);
        tasks.push(spawn_periodic(
            "purge",
            config.purge_interval_ms,
            shutdown.clone(),
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.purge().await;
                }
            },
        ));

        let this = Arc::clone(&self);
        tasks.push(spawn_periodic(
            "retry_trees",
            config.tree_retry_interval_ms,
            shutdown.clone(),
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.retry_trees().await;
                }
            },
        ));

        let this = self;
        tasks.push(spawn_periodic(
            "mirror_stats",
            config.stats_interval_ms,
            shutdown,
            move || {
                let this = Arc::clone(&this);
                async move { this.mirror_stats() }
            },
        ));

        tasks
    }
}

fn gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Run `tick` every `period_ms` until shutdown. The first tick fires after one
/// full period, not immediately.
pub(crate) fn spawn_periodic<F, Fut>(
    task: &'static str,
    period_ms: u64,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let period = Duration::from_millis(period_ms.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        log_event!(debug, COMPONENT, "Maintenance task stopped", task = task);
    })
}
