//! Collaborator interface to the remote submission endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

/// Result of one health probe against the liveness endpoint
///
/// Three-valued on purpose: only network-implicated failures count toward
/// the offline threshold, and a reachable server is not proof of health
/// unless it returns the recognized liveness payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Success status and recognized liveness payload; resets the failure
    /// counter and restores online state immediately
    Healthy,
    /// The server answered but the response is not proof of health
    /// (error status or unrecognized body); neither resets nor increments
    /// the failure counter
    Degraded,
    /// Network-shaped failure (timeout, abort, connect error); counts
    /// toward the offline threshold
    Unreachable,
}

/// The backend's acknowledgement of an accepted record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAck {
    /// HTTP status the backend answered with
    pub status: u16,
    /// Response body, typically the created record
    pub body: serde_json::Value,
}

impl ServerAck {
    /// Server-side id of the created record, when the body carries one
    pub fn record_id(&self) -> Option<i64> {
        self.body.get("id").and_then(serde_json::Value::as_i64)
    }
}

/// Abstraction over the remote submission endpoint
///
/// Production uses an HTTP implementation; tests use scripted mocks. The
/// error kind returned by [`submit_record`](Self::submit_record) must be
/// reliable: the gateway queues on [`SubmitError::Network`] and surfaces
/// everything else unchanged.
#[async_trait]
pub trait RegistrationBackend<P>: Send + Sync {
    /// Attempt a live submission of one record
    async fn submit_record(&self, payload: &P) -> Result<ServerAck, SubmitError>;

    /// Probe the liveness endpoint
    ///
    /// Must respond quickly and represent server reachability, not merely
    /// process liveness. Classification of failures happens here so the
    /// connectivity monitor can stay transport-agnostic.
    async fn check_health(&self) -> ProbeOutcome;
}
