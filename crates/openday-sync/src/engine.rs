//! Queue draining against the remote endpoint
//!
//! Replays queued records one at a time, oldest first. A drain is
//! single-flight: overlapping triggers (a connectivity transition and a
//! manual sync arriving together) collapse into a no-op instead of racing
//! each other into duplicate submissions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use openday_core::{RecordPayload, RegistrationBackend};
use openday_outbox::OutboxStore;

use crate::connectivity::ConnectivityMonitor;
use crate::publisher::{StatusPublisher, SubscriptionToken};

/// Aggregate result of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records acknowledged and removed from the queue
    pub success: usize,
    /// Records whose attempt failed; they stay queued for the next pass
    pub failed: usize,
}

/// Releases the single-flight flag on every exit path
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drains the durable queue record-by-record
pub struct SyncEngine<P: RecordPayload> {
    backend: Arc<dyn RegistrationBackend<P>>,
    outbox: Arc<dyn OutboxStore<P>>,
    monitor: Arc<ConnectivityMonitor<P>>,
    draining: AtomicBool,
    data_changed: StatusPublisher<DrainReport>,
}

impl<P: RecordPayload> SyncEngine<P> {
    /// Create an engine over the given queue and backend
    pub fn new(
        backend: Arc<dyn RegistrationBackend<P>>,
        outbox: Arc<dyn OutboxStore<P>>,
        monitor: Arc<ConnectivityMonitor<P>>,
    ) -> Self {
        Self {
            backend,
            outbox,
            monitor,
            draining: AtomicBool::new(false),
            data_changed: StatusPublisher::new(),
        }
    }

    /// Whether a drain pass is currently running
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Subscribe to successful-drain notifications
    ///
    /// Fired after any pass that removed at least one record, so cached
    /// views can refresh themselves instead of the engine forcing a
    /// wholesale reload.
    pub fn subscribe_data_changed<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(DrainReport) + Send + Sync + 'static,
    {
        self.data_changed.subscribe(callback)
    }

    /// Remove a data-changed subscriber; idempotent
    pub fn unsubscribe_data_changed(&self, token: SubscriptionToken) {
        self.data_changed.unsubscribe(token);
    }

    /// Run one drain pass
    ///
    /// Returns immediately with a zero report when offline or when
    /// another pass is already running. Never raises: record-level
    /// failures are aggregated into the report, and a failed record
    /// never aborts the batch, since the cause may be record-specific
    /// rather than connectivity-wide.
    pub async fn drain(&self) -> DrainReport {
        if !self.monitor.is_online() {
            debug!("Drain requested while offline, skipping");
            return DrainReport::default();
        }

        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Drain already in progress, collapsing trigger");
            return DrainReport::default();
        }
        let _guard = DrainGuard {
            flag: &self.draining,
        };

        let records = match self.outbox.list_pending().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Could not read queue for drain");
                return DrainReport::default();
            }
        };

        if records.is_empty() {
            return DrainReport::default();
        }

        info!(pending = records.len(), "Draining queued records");
        let mut report = DrainReport::default();

        for record in records {
            match self.backend.submit_record(&record.payload).await {
                Ok(ack) => {
                    debug!(record = %record.id, status = ack.status, "Queued record accepted");
                    if let Err(e) = self.outbox.remove(record.id).await {
                        // The backend has the record; a failed delete risks
                        // one duplicate replay on the next pass
                        warn!(record = %record.id, error = %e, "Failed to remove acknowledged record");
                    }
                    report.success += 1;
                }
                Err(e) => {
                    warn!(record = %record.id, error = %e, "Replay failed, record stays queued");
                    report.failed += 1;
                }
            }
        }

        info!(
            success = report.success,
            failed = report.failed,
            "Drain complete"
        );

        if report.success > 0 {
            self.data_changed.notify(report);
        }

        report
    }
}
