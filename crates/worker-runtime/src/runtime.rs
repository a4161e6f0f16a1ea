//! # Worker Runtime
//!
//! Owns the container and every background task.
//!
//! ## Startup
//!
//! 1. Validate configuration and assemble the container
//! 2. Start the queue supervisor's consumer pools
//! 3. Start the event bridge and the maintenance intervals
//!
//! ## Shutdown
//!
//! 1. Stop the consumer pools; in-flight messages finish or return to the queue
//! 2. Signal the maintenance tasks and the event bridge
//! 3. Flush listings still waiting out their debounce window

use crate::config::RuntimeConfig;
use crate::container::{ContainerError, PipelineContainer};
use crate::events::spawn_bridge;
use crate::maintenance::Maintenance;
use crate::metrics_server;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tp_07_queue_supervisor::{QueueSupervisorApi, SupervisorError};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error("metrics endpoint: {0}")]
    Metrics(#[from] std::io::Error),
}

pub struct WorkerRuntime {
    container: Arc<PipelineContainer>,
    maintenance: Arc<Maintenance>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl WorkerRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Ok(Self::from_container(PipelineContainer::new(config)?))
    }

    pub fn from_container(container: PipelineContainer) -> Self {
        let container = Arc::new(container);
        let maintenance = Arc::new(Maintenance::new(
            container.listings.clone(),
            container.trees.clone(),
            Arc::clone(&container.cache),
            container.config.maintenance.clone(),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container,
            maintenance,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    pub async fn start(&self) -> Result<(), RuntimeError> {
        info!("Starting worker runtime");

        self.container.supervisor.start()?;

        let bridge = spawn_bridge(&self.container.bus, self.shutdown_rx.clone());
        self.tasks.lock().push(bridge);

        let maintenance = Arc::clone(&self.maintenance).spawn(self.shutdown_rx.clone());
        self.tasks.lock().extend(maintenance);

        info!(
            consumers = self.container.config.supervisor.total_consumers(),
            "Worker runtime started"
        );
        Ok(())
    }

    /// Serve `/metrics` on `addr` until shutdown.
    pub async fn serve_metrics(&self, addr: SocketAddr) -> Result<SocketAddr, RuntimeError> {
        let (bound, handle) = metrics_server::serve(addr, self.shutdown_rx.clone()).await?;
        self.tasks.lock().push(handle);
        Ok(bound)
    }

    /// Idempotent.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Initiating graceful shutdown");

        self.container.supervisor.shutdown().await;

        if self.shutdown_tx.send(true).is_err() {
            warn!("No background task was listening for shutdown");
        }
        let tasks: Vec<_> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Background task ended abnormally");
            }
        }

        let report = self.maintenance.flush_pending().await;
        info!(
            rebuilt = report.rebuilt,
            deferred = report.deferred,
            "Shutdown complete"
        );
    }

    pub fn container(&self) -> Arc<PipelineContainer> {
        Arc::clone(&self.container)
    }

    pub fn maintenance(&self) -> Arc<Maintenance> {
        Arc::clone(&self.maintenance)
    }
}
