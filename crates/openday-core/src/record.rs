//! Record types for queued submissions

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Unique identifier for a queued record
///
/// Assigned by the store (never the caller), monotonically increasing
/// within one queue. A reopened store continues above the highest id it
/// replayed from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Create a record ID from a raw value
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw numeric value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bound alias for payloads the queue can carry
///
/// The queue treats payloads as opaque: whatever the remote submission
/// endpoint expects. Implemented automatically for any eligible type.
pub trait RecordPayload:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

impl<T> RecordPayload for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A record waiting for submission
///
/// Residency in the queue is the marker of "not yet confirmed accepted":
/// a record is removed on acknowledgement rather than flagged, so there is
/// no synced state to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecord<P> {
    /// Store-assigned identifier
    pub id: RecordId,
    /// The payload the terminal intended to submit
    pub payload: P,
    /// When the record entered the queue; drives FIFO ordering and
    /// "pending since" display
    pub enqueued_at: DateTime<Utc>,
}

impl<P> PendingRecord<P> {
    /// Create a pending record
    pub fn new(id: RecordId, payload: P, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            enqueued_at,
        }
    }

    /// How long the record has been waiting
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.enqueued_at
    }
}
