//! Command-line flags. Applied after the config file and the environment.

use crate::config::{RuntimeConfig, StorageBackend};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tp_06_vote_consumer::QueueName;

/// Tippr vote-processing worker
#[derive(Parser, Debug)]
#[command(name = "tippr-worker")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file
    #[arg(long, short = 'c', env = "TIPPR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Durable store backend (memory, rocksdb)
    #[arg(long)]
    pub storage: Option<StorageBackend>,

    /// RocksDB directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Pool size for one queue, e.g. `--consumers votes.link=8`. Repeatable.
    #[arg(long = "consumers", value_name = "QUEUE=N", value_parser = parse_pool_size)]
    pub consumers: Vec<(QueueName, usize)>,

    /// Metrics listen address; overrides TIPPR_METRICS_PORT
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = dir.clone();
        }
        for &(queue, consumers) in &self.consumers {
            config.supervisor.set_consumers(queue, consumers);
        }
    }
}

fn parse_pool_size(s: &str) -> Result<(QueueName, usize), String> {
    let (queue, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected QUEUE=N, got {s:?}"))?;
    let queue: QueueName = queue.trim().parse()?;
    let count = count
        .trim()
        .parse()
        .map_err(|e| format!("invalid consumer count {count:?}: {e}"))?;
    Ok((queue, count))
}
