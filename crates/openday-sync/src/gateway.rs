//! The single entry point the UI uses to submit a record
//!
//! Hides online/offline branching from callers: a live attempt that dies
//! on the wire quietly becomes a queued record, while a genuine rejection
//! by the server propagates unchanged. The gateway also self-corrects
//! between scheduled probes: an outage discovered mid-call flips the
//! connectivity state immediately instead of waiting for the monitor's
//! next tick.

use std::sync::Arc;

use tracing::{debug, info, warn};

use openday_core::{RecordId, RecordPayload, RegistrationBackend, ServerAck, SubmitError};
use openday_outbox::OutboxStore;

use crate::connectivity::ConnectivityMonitor;

/// What happened to a submitted record
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The backend accepted the record live
    Accepted(ServerAck),
    /// The record was queued for later replay
    Queued {
        /// Store-assigned id of the queued record
        id: RecordId,
    },
}

impl SubmitOutcome {
    /// Whether the record went into the offline queue
    pub fn is_offline(&self) -> bool {
        matches!(self, SubmitOutcome::Queued { .. })
    }

    /// Queue id, when the record was queued
    pub fn queued_id(&self) -> Option<RecordId> {
        match self {
            SubmitOutcome::Queued { id } => Some(*id),
            SubmitOutcome::Accepted(_) => None,
        }
    }
}

/// Gateway between the UI and the submission endpoint
pub struct SubmissionGateway<P: RecordPayload> {
    backend: Arc<dyn RegistrationBackend<P>>,
    outbox: Arc<dyn OutboxStore<P>>,
    monitor: Arc<ConnectivityMonitor<P>>,
}

impl<P: RecordPayload> SubmissionGateway<P> {
    /// Create a gateway over the given backend, queue, and monitor
    pub fn new(
        backend: Arc<dyn RegistrationBackend<P>>,
        outbox: Arc<dyn OutboxStore<P>>,
        monitor: Arc<ConnectivityMonitor<P>>,
    ) -> Self {
        Self {
            backend,
            outbox,
            monitor,
        }
    }

    /// Submit a record, live or queued
    ///
    /// Network-shaped failures are absorbed: the record is queued and the
    /// connectivity state flipped. Application-level rejections and
    /// storage failures propagate, since queueing a record the server
    /// will reject again only degrades trust in the queue.
    pub async fn submit(&self, payload: P) -> Result<SubmitOutcome, SubmitError> {
        if !self.monitor.is_online() {
            debug!("Offline, queueing record without a live attempt");
            return self.enqueue(payload).await;
        }

        match self.backend.submit_record(&payload).await {
            Ok(ack) => {
                debug!(status = ack.status, "Record accepted live");
                Ok(SubmitOutcome::Accepted(ack))
            }
            Err(e) if e.is_network() => {
                warn!(error = %e, "Live submission died on the wire, falling back to queue");
                self.monitor.signal_offline();
                self.enqueue(payload).await
            }
            Err(e) => {
                debug!(error = %e, "Submission rejected, propagating to caller");
                Err(e)
            }
        }
    }

    async fn enqueue(&self, payload: P) -> Result<SubmitOutcome, SubmitError> {
        let id = self.outbox.enqueue(payload).await?;
        info!(record = %id, "Record queued for replay");
        Ok(SubmitOutcome::Queued { id })
    }
}
