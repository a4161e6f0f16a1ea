//! Prometheus metrics for Tippr workers.
//!
//! All metrics follow the naming convention: `tippr_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counters** are driven by pipeline events as they happen
//!   (votes applied, listings rebuilt).
//! - **Gauges** mirror cumulative counters that components keep internally
//!   (cache statistics, delivery outcomes), refreshed by the worker runtime
//!   on every export tick.
//! - **Histograms** time the periodic maintenance tasks.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter,
    IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // VOTE LEDGER
    // =========================================================================

    /// Votes that changed an aggregate
    pub static ref VOTES_APPLIED: IntCounter = IntCounter::new(
        "tippr_ledger_votes_applied_total",
        "Votes that changed an item aggregate"
    ).expect("metric creation failed");

    /// Replayed or unchanged votes
    pub static ref VOTES_NOOP: IntCounter = IntCounter::new(
        "tippr_ledger_votes_noop_total",
        "Votes that matched the stored direction"
    ).expect("metric creation failed");

    /// Votes dead-lettered (unknown item, malformed)
    pub static ref VOTES_REJECTED: IntCounter = IntCounter::new(
        "tippr_ledger_votes_rejected_total",
        "Votes rejected and dead-lettered"
    ).expect("metric creation failed");

    /// Aggregates quarantined after an invariant violation
    pub static ref AGGREGATES_QUARANTINED: IntCounter = IntCounter::new(
        "tippr_ledger_aggregates_quarantined_total",
        "Aggregates quarantined for invariant violations"
    ).expect("metric creation failed");

    // =========================================================================
    // COMMENT TREE / LISTING INDEX
    // =========================================================================

    /// Comment tree passes by kind
    pub static ref TREE_PASSES: IntCounterVec = IntCounterVec::new(
        Opts::new("tippr_tree_passes_total", "Comment tree maintenance passes"),
        &["pass"]  // pass: rebuild/resort
    ).expect("metric creation failed");

    /// Listing rebuilds by sort
    pub static ref LISTING_REBUILDS: IntCounterVec = IntCounterVec::new(
        Opts::new("tippr_listing_rebuilds_total", "Listing rebuilds"),
        &["sort"]
    ).expect("metric creation failed");

    /// Duration of a full listing sweep
    pub static ref LISTING_SWEEP_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "tippr_listing_sweep_duration_seconds",
            "Time spent on a periodic listing sweep"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    /// Duration of maintenance tasks by name
    pub static ref MAINTENANCE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tippr_maintenance_duration_seconds",
            "Time spent on periodic maintenance"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("valid buckets")),
        &["task"]  // task: purge/flush_pending
    ).expect("metric creation failed");

    // =========================================================================
    // CACHE TIER
    // =========================================================================

    /// Cache counters mirrored from the cache manager
    pub static ref CACHE_STATS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tippr_cache_events", "Cumulative cache tier counters"),
        &["event"]  // volatile_hit/durable_hit/miss/stale/placeholder/compute/...
    ).expect("metric creation failed");

    /// Entries per in-memory tier
    pub static ref CACHE_ENTRIES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tippr_cache_entries", "Entries held per cache tier"),
        &["tier"]
    ).expect("metric creation failed");

    /// Invalidations seen on the bus
    pub static ref CACHE_INVALIDATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("tippr_cache_invalidations_total", "Cache invalidations"),
        &["mode"]  // mode: drop/stale
    ).expect("metric creation failed");

    // =========================================================================
    // QUEUES
    // =========================================================================

    /// Pending messages per queue
    pub static ref QUEUE_DEPTH: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tippr_queue_depth", "Messages waiting per queue"),
        &["queue"]
    ).expect("metric creation failed");

    /// Delivery outcomes per queue, mirrored from the consumer pool
    pub static ref DELIVERIES: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tippr_queue_deliveries", "Cumulative delivery outcomes"),
        &["queue", "outcome"]  // outcome: acked/nacked/dead_lettered
    ).expect("metric creation failed");

    /// Running consumers per queue
    pub static ref POOL_CONSUMERS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tippr_pool_consumers", "Running consumers per queue"),
        &["queue"]
    ).expect("metric creation failed");

    /// Pool restarts per queue
    pub static ref POOL_RESTARTS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tippr_pool_restarts", "Pool restarts after queue failures"),
        &["queue"]
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Critical errors by component
    pub static ref CRITICAL_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("tippr_critical_errors_total", "Critical errors by component"),
        &["component"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already-registered collectors are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(VOTES_APPLIED.clone()),
        Box::new(VOTES_NOOP.clone()),
        Box::new(VOTES_REJECTED.clone()),
        Box::new(AGGREGATES_QUARANTINED.clone()),
        // Trees and listings
        Box::new(TREE_PASSES.clone()),
        Box::new(LISTING_REBUILDS.clone()),
        Box::new(LISTING_SWEEP_DURATION.clone()),
        Box::new(MAINTENANCE_DURATION.clone()),
        // Cache
        Box::new(CACHE_STATS.clone()),
        Box::new(CACHE_ENTRIES.clone()),
        Box::new(CACHE_INVALIDATIONS.clone()),
        // Queues
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(DELIVERIES.clone()),
        Box::new(POOL_CONSUMERS.clone()),
        Box::new(POOL_RESTARTS.clone()),
        // Errors
        Box::new(CRITICAL_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Render all metrics in Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
