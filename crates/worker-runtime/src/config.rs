//! # Worker Configuration
//!
//! One `Default` struct per concern, aggregated into [`RuntimeConfig`].
//!
//! ## Loading order
//!
//! 1. Defaults
//! 2. Optional JSON file (`--config`). Missing fields keep their defaults.
//! 3. Environment overrides
//! 4. Command-line flags (see [`crate::cli::Args`])
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `TIPPR_CONSUMERS_<QUEUE>` | pool size, e.g. `TIPPR_CONSUMERS_VOTES_LINK=8` |
//! | `TIPPR_STORAGE` | `memory` or `rocksdb` |
//! | `TIPPR_DATA_DIR` | RocksDB directory |
//! | `TIPPR_MAX_ATTEMPTS` | delivery retry budget before dead-lettering |
//! | `TIPPR_LISTING_DEBOUNCE_MS` | minimum spacing of listing rebuilds |

use serde::{Deserialize, Serialize};
use shared_types::{Classify, ErrorClass};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tp_01_cache_tier::CacheConfig;
use tp_03_vote_ledger::LedgerConfig;
use tp_04_comment_tree::TreeConfig;
use tp_05_listing_index::ListingConfig;
use tp_06_vote_consumer::{ConsumerConfig, QueueName};
use tp_07_queue_supervisor::SupervisorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {var}: {reason}")]
    Env {
        var: String,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Classify for ConfigError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Malformed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Durable store selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// RocksDB directory. Ignored by the memory backend.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data/durable"),
        }
    }
}

/// Periodic background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Rebuild listings whose debounce window has passed.
    pub flush_interval_ms: u64,
    /// Rebuild every known listing.
    pub sweep_interval_ms: u64,
    /// Drop expired cache entries, locks and durable records.
    pub purge_interval_ms: u64,
    /// Mirror component stats into gauges.
    pub stats_interval_ms: u64,
    /// Retry comment trees parked after repeated failed passes.
    pub tree_retry_interval_ms: u64,
    /// Durable key prefixes swept for expired records.
    pub durable_purge_prefixes: Vec<String>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 1_000,
            sweep_interval_ms: 5 * 60_000,
            purge_interval_ms: 60_000,
            stats_interval_ms: 10_000,
            tree_retry_interval_ms: 30_000,
            durable_purge_prefixes: vec!["frag:".to_string()],
        }
    }
}

/// Complete worker configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cache: CacheConfig,
    pub ledger: LedgerConfig,
    pub tree: TreeConfig,
    pub listing: ListingConfig,
    pub supervisor: SupervisorConfig,
    pub maintenance: MaintenanceConfig,
    pub storage: StorageConfig,
    /// Attempt from which deliveries still failing on store trouble are
    /// logged at warn. `None` keeps the consumer default; 0 never warns.
    pub max_attempts: Option<u32>,
}

impl RuntimeConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for queue in QueueName::ALL {
            let var = format!("TIPPR_CONSUMERS_{}", queue.env_suffix());
            if let Some(value) = lookup(&var) {
                let consumers = parse_env(&var, &value)?;
                self.supervisor.set_consumers(queue, consumers);
            }
        }
        if let Some(value) = lookup("TIPPR_STORAGE") {
            self.storage.backend = value.parse().map_err(|reason| ConfigError::Env {
                var: "TIPPR_STORAGE".into(),
                value: value.clone(),
                reason,
            })?;
        }
        if let Some(value) = lookup("TIPPR_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("TIPPR_MAX_ATTEMPTS") {
            self.max_attempts = Some(parse_env("TIPPR_MAX_ATTEMPTS", &value)?);
        }
        if let Some(value) = lookup("TIPPR_LISTING_DEBOUNCE_MS") {
            self.listing.debounce_ms = parse_env("TIPPR_LISTING_DEBOUNCE_MS", &value)?;
        }
        Ok(())
    }

    /// Settings of the handler shared by every pool.
    pub fn consumer_config(&self) -> ConsumerConfig {
        let mut config = ConsumerConfig::default();
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let lock_settings = [
            ("ledger", self.ledger.lock_ttl_ms, self.ledger.lock_attempts),
            ("tree", self.tree.lock_ttl_ms, self.tree.lock_attempts),
            ("listing", self.listing.lock_ttl_ms, self.listing.lock_attempts),
        ];
        for (name, ttl, attempts) in lock_settings {
            if ttl == 0 || attempts == 0 {
                return invalid(format!("{name} lock TTL and attempts must be non-zero"));
            }
        }

        let listing = &self.listing;
        if listing.max_items == 0 {
            return invalid("listing max_items must be non-zero".into());
        }
        if listing.default_page_size == 0 || listing.default_page_size > listing.max_page_size {
            return invalid(format!(
                "listing page size {} must be within 1..={}",
                listing.default_page_size, listing.max_page_size
            ));
        }

        let supervisor = &self.supervisor;
        for (queue, queue_config) in &supervisor.queues {
            if queue_config.consumers > supervisor.max_consumers_per_queue {
                return invalid(format!(
                    "{queue}: {} consumers exceeds the limit of {}",
                    queue_config.consumers, supervisor.max_consumers_per_queue
                ));
            }
        }
        if supervisor.low_water > supervisor.high_water {
            return invalid("backpressure low water must not exceed high water".into());
        }
        let backoff = &supervisor.backoff;
        if backoff.base_ms == 0 || backoff.max_ms < backoff.base_ms {
            return invalid("backoff base must be non-zero and not exceed the maximum".into());
        }
        if !(0.0..=1.0).contains(&backoff.jitter) || backoff.multiplier < 1.0 {
            return invalid("backoff jitter must be within [0, 1] and multiplier at least 1".into());
        }

        let maintenance = &self.maintenance;
        let intervals = [
            maintenance.flush_interval_ms,
            maintenance.sweep_interval_ms,
            maintenance.purge_interval_ms,
            maintenance.stats_interval_ms,
            maintenance.tree_retry_interval_ms,
            supervisor.monitor_interval_ms,
        ];
        if intervals.contains(&0) {
            return invalid("maintenance and monitor intervals must be non-zero".into());
        }
        Ok(())
    }

    /// Small, fast settings for tests.
    pub fn for_testing() -> Self {
        Self {
            cache: CacheConfig::for_testing(),
            ledger: LedgerConfig::for_testing(),
            tree: TreeConfig::for_testing(),
            listing: ListingConfig::for_testing(),
            supervisor: SupervisorConfig::for_testing(),
            maintenance: MaintenanceConfig {
                flush_interval_ms: 20,
                sweep_interval_ms: 200,
                purge_interval_ms: 100,
                stats_interval_ms: 50,
                tree_retry_interval_ms: 100,
                durable_purge_prefixes: vec!["frag:".to_string()],
            },
            storage: StorageConfig::default(),
            max_attempts: Some(ConsumerConfig::for_testing().max_attempts),
        }
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}

fn parse_env<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
