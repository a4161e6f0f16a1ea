//! # Pipeline Container
//!
//! Builds every stage once and wires it to its adapters.
//!
//! ## Construction order
//!
//! ```text
//! backends (store, queue, directory, clock)
//!   └─ lock tier, event bus, ranking engine
//!        └─ cache manager
//!        └─ vote ledger
//!             └─ comment-tree maintainer (ranks from the ledger)
//!             └─ listing index (candidates from directory + ledger)
//!                  └─ vote consumer (handler for every queue)
//!                       └─ queue supervisor
//! ```
//!
//! All stages share one lock tier, so a RecomputeLock taken by the ledger is
//! visible to the cache manager and the other stages.

use crate::adapters::{DirectoryCandidateSource, DirectoryCommentSource, LedgerRankSource};
use crate::config::{ConfigError, RuntimeConfig, StorageBackend, StorageConfig};
use shared_bus::InMemoryEventBus;
use shared_types::{StoreError, SystemTimeSource, TimeSource};
use std::sync::Arc;
use thiserror::Error;
use tp_01_cache_tier::{
    CacheError, CacheManager, InMemoryKVStore, InMemoryLockTier, KeyValueStore, LockTier,
    LruCacheStore,
};
use tp_02_ranking::RankingEngine;
use tp_03_vote_ledger::{InMemoryItemDirectory, LedgerDependencies, VoteLedger};
use tp_04_comment_tree::{CommentTreeMaintainer, TreeDependencies};
use tp_05_listing_index::{ListingDependencies, ListingIndex};
use tp_06_vote_consumer::{ConsumerDependencies, InMemoryQueue, MessageQueue, VoteConsumer};
use tp_07_queue_supervisor::{QueueSupervisor, SupervisorDependencies};
use tracing::info;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("durable store: {0}")]
    Store(#[from] StoreError),

    #[error("storage backend {0} is not compiled in (enable the `{0}` feature)")]
    BackendDisabled(&'static str),
}

/// External systems the pipeline talks to.
pub struct Backends {
    pub store: Arc<dyn KeyValueStore>,
    pub queue: Arc<dyn MessageQueue>,
    /// Stand-in for the account store's item metadata.
    pub directory: Arc<InMemoryItemDirectory>,
    pub time: Arc<dyn TimeSource>,
}

impl Backends {
    pub fn in_memory(time: Arc<dyn TimeSource>) -> Self {
        Self {
            store: Arc::new(InMemoryKVStore::new()),
            queue: Arc::new(InMemoryQueue::new(Arc::clone(&time))),
            directory: Arc::new(InMemoryItemDirectory::new()),
            time,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Result<Self, ContainerError> {
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let mut backends = Self::in_memory(time);
        if storage.backend == StorageBackend::RocksDb {
            backends.store = open_rocksdb(storage)?;
        }
        Ok(backends)
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(storage: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, ContainerError> {
    use tp_01_cache_tier::{RocksDbConfig, RocksDbStore};

    let config = RocksDbConfig {
        path: storage.data_dir.to_string_lossy().into_owned(),
        ..RocksDbConfig::default()
    };
    info!(path = %config.path, "Opening RocksDB durable store");
    Ok(Arc::new(RocksDbStore::open(config)?))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_storage: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, ContainerError> {
    Err(ContainerError::BackendDisabled("rocksdb"))
}

#[derive(Clone)]
pub struct PipelineContainer {
    pub config: RuntimeConfig,
    pub time: Arc<dyn TimeSource>,
    pub bus: Arc<InMemoryEventBus>,
    pub store: Arc<dyn KeyValueStore>,
    pub locks: Arc<dyn LockTier>,
    pub directory: Arc<InMemoryItemDirectory>,
    pub queue: Arc<dyn MessageQueue>,
    pub cache: Arc<CacheManager>,
    pub ledger: Arc<VoteLedger>,
    pub trees: Arc<CommentTreeMaintainer>,
    pub listings: Arc<ListingIndex>,
    pub consumer: Arc<VoteConsumer>,
    pub supervisor: Arc<QueueSupervisor>,
}

impl PipelineContainer {
    pub fn new(config: RuntimeConfig) -> Result<Self, ContainerError> {
        let backends = Backends::from_config(&config.storage)?;
        Self::with_backends(config, backends)
    }

    pub fn with_backends(config: RuntimeConfig, backends: Backends) -> Result<Self, ContainerError> {
        config.validate()?;
        let Backends {
            store,
            queue,
            directory,
            time,
        } = backends;

        let bus = Arc::new(InMemoryEventBus::new());
        let locks: Arc<dyn LockTier> = Arc::new(InMemoryLockTier::new(Arc::clone(&time)));
        let ranking = Arc::new(RankingEngine::new());

        let cache = Arc::new(CacheManager::with_tiers(
            config.cache.clone(),
            Arc::clone(&locks),
            Arc::clone(&store),
            Arc::new(LruCacheStore::new(config.cache.volatile_capacity)),
            Arc::new(LruCacheStore::new(config.cache.stale_capacity)),
            Arc::clone(&time),
        )?);

        let ledger = Arc::new(VoteLedger::new(
            LedgerDependencies {
                store: Arc::clone(&store),
                locks: Arc::clone(&locks),
                directory: directory.clone(),
                ranking: ranking.clone(),
                publisher: bus.clone(),
                time: Arc::clone(&time),
            },
            config.ledger.clone(),
        ));

        let trees = Arc::new(CommentTreeMaintainer::new(
            TreeDependencies {
                store: Arc::clone(&store),
                locks: Arc::clone(&locks),
                comments: Arc::new(DirectoryCommentSource::new(directory.clone())),
                ranks: Arc::new(LedgerRankSource::new(Arc::clone(&ledger))),
                ranking: ranking.clone(),
                publisher: bus.clone(),
            },
            config.tree.clone(),
        ));

        let listings = Arc::new(ListingIndex::new(
            ListingDependencies {
                store: Arc::clone(&store),
                locks: Arc::clone(&locks),
                candidates: Arc::new(DirectoryCandidateSource::new(
                    Arc::clone(&directory),
                    Arc::clone(&ledger),
                )),
                ranking,
                publisher: bus.clone(),
                time: Arc::clone(&time),
            },
            config.listing.clone(),
        ));

        let consumer = Arc::new(VoteConsumer::new(
            ConsumerDependencies {
                ledger: ledger.clone(),
                directory: directory.clone(),
                trees: trees.clone(),
                listings: listings.clone(),
                cache: cache.clone(),
                publisher: bus.clone(),
            },
            config.consumer_config(),
        ));

        let supervisor = Arc::new(QueueSupervisor::new(
            SupervisorDependencies {
                queue: Arc::clone(&queue),
                handler: consumer.clone(),
                publisher: bus.clone(),
            },
            config.supervisor.clone(),
        ));

        info!(
            storage = ?config.storage.backend,
            consumers = config.supervisor.total_consumers(),
            "Pipeline container assembled"
        );

        Ok(Self {
            config,
            time,
            bus,
            store,
            locks,
            directory,
            queue,
            cache,
            ledger,
            trees,
            listings,
            consumer,
            supervisor,
        })
    }
}
