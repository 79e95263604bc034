//! Pipeline coordinator
//!
//! Ties the monitor, engine, gateway, and queue together and owns their
//! lifecycle: the periodic probe loop, and the wiring that turns an
//! offline→online transition into exactly one drain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use openday_core::{RecordPayload, RegistrationBackend, StorageError, SubmitError};
use openday_outbox::OutboxStore;

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::{DrainReport, SyncEngine};
use crate::gateway::{SubmissionGateway, SubmitOutcome};
use crate::publisher::{StatusPublisher, SubscriptionToken};

/// Lifecycle errors for the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `start()` was called twice
    #[error("Pipeline already started")]
    AlreadyStarted,
}

/// The offline-resilient submission pipeline
///
/// The only surface the UI layer needs: submit a record, watch
/// connectivity, poll the pending count, trigger a manual sync.
pub struct OfflinePipeline<P: RecordPayload> {
    outbox: Arc<dyn OutboxStore<P>>,
    monitor: Arc<ConnectivityMonitor<P>>,
    engine: Arc<SyncEngine<P>>,
    gateway: SubmissionGateway<P>,
    config: SyncConfig,
    started: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    background_tasks: RwLock<Vec<JoinHandle<()>>>,
    wiring_token: RwLock<Option<SubscriptionToken>>,
}

impl<P: RecordPayload> OfflinePipeline<P> {
    /// Assemble a pipeline over the given backend and queue
    pub fn new(
        backend: Arc<dyn RegistrationBackend<P>>,
        outbox: Arc<dyn OutboxStore<P>>,
        config: SyncConfig,
    ) -> Self {
        let publisher = Arc::new(StatusPublisher::new());
        let monitor = Arc::new(ConnectivityMonitor::new(
            backend.clone(),
            config.connectivity.clone(),
            publisher,
        ));
        let engine = Arc::new(SyncEngine::new(
            backend.clone(),
            outbox.clone(),
            monitor.clone(),
        ));
        let gateway = SubmissionGateway::new(backend, outbox.clone(), monitor.clone());
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            outbox,
            monitor,
            engine,
            gateway,
            config,
            started: AtomicBool::new(false),
            shutdown_tx,
            background_tasks: RwLock::new(Vec::new()),
            wiring_token: RwLock::new(None),
        }
    }

    /// Start the probe loop and the transition→drain wiring
    ///
    /// When configured, also runs one drain immediately to replay records
    /// left over from a previous run.
    pub async fn start(&self) -> Result<(), PipelineError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyStarted);
        }

        // Drain exactly once per offline→online edge. The subscription's
        // immediate initial delivery matches the seeded previous state, so
        // it never counts as an edge.
        let engine = self.engine.clone();
        let previous = Arc::new(AtomicBool::new(self.monitor.is_online()));
        let token = self.monitor.subscribe(move |online| {
            let was = previous.swap(online, Ordering::SeqCst);
            if online && !was {
                debug!("Connectivity transition observed, scheduling drain");
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.drain().await;
                });
            }
        });
        *self.wiring_token.write().await = Some(token);

        let probe_task = ConnectivityMonitor::spawn_probe_loop(
            self.monitor.clone(),
            self.shutdown_tx.subscribe(),
        );
        self.background_tasks.write().await.push(probe_task);

        if self.config.drain_on_start {
            self.engine.drain().await;
        }

        info!("Submission pipeline started");
        Ok(())
    }

    /// Stop the probe loop and wiring; safe to call more than once
    pub async fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown_tx.send(());

        if let Some(token) = self.wiring_token.write().await.take() {
            self.monitor.unsubscribe(token);
        }

        let mut tasks = self.background_tasks.write().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }

        info!("Submission pipeline stopped");
    }

    /// Submit a record, live or queued (see [`SubmissionGateway::submit`])
    pub async fn submit(&self, payload: P) -> Result<SubmitOutcome, SubmitError> {
        self.gateway.submit(payload).await
    }

    /// Number of records waiting for replay
    pub async fn pending_count(&self) -> Result<usize, StorageError> {
        self.outbox.count().await
    }

    /// Current connectivity state
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Trigger a manual drain ("sync now")
    pub async fn trigger_sync(&self) -> DrainReport {
        self.engine.drain().await
    }

    /// Subscribe to connectivity changes; the callback receives the
    /// current state immediately
    pub fn subscribe_connectivity<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.monitor.subscribe(callback)
    }

    /// Remove a connectivity subscriber; idempotent
    pub fn unsubscribe_connectivity(&self, token: SubscriptionToken) {
        self.monitor.unsubscribe(token);
    }

    /// Subscribe to successful-drain notifications
    pub fn subscribe_data_changed<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(DrainReport) + Send + Sync + 'static,
    {
        self.engine.subscribe_data_changed(callback)
    }

    /// Remove a data-changed subscriber; idempotent
    pub fn unsubscribe_data_changed(&self, token: SubscriptionToken) {
        self.engine.unsubscribe_data_changed(token);
    }

    /// The connectivity monitor, for platform reachability signals
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor<P>> {
        &self.monitor
    }

    /// The underlying queue, for administrative operations
    pub fn outbox(&self) -> &Arc<dyn OutboxStore<P>> {
        &self.outbox
    }

    /// Whether the pipeline is running
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}
