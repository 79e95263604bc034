//! Error types shared across the pipeline

use thiserror::Error;

/// Errors from the durable queue
#[derive(Debug, Error)]
pub enum StorageError {
    /// Persistent storage cannot accept writes; the record was NOT saved
    /// and the caller must surface the loss
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Storage I/O error
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Failed to encode a record or log entry
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failed to decode a record or log entry
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

/// Errors from a submission attempt
///
/// The gateway's offline fallback depends on the network/application
/// distinction: [`SubmitError::Network`] triggers queueing, everything
/// else propagates to the caller unchanged.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Transport-implicated failure (timeout, abort, connection refused).
    /// The record can be queued and replayed later.
    #[error("Network failure: {0}")]
    Network(String),

    /// The server is reachable and refused the record (validation, auth,
    /// conflict). Replaying would fail again, so this is never queued.
    #[error("Rejected by server (status {status}): {detail}")]
    Rejected {
        /// HTTP status code of the rejection
        status: u16,
        /// Server-provided detail, when present
        detail: String,
    },

    /// The request could not be built or the response could not be
    /// decoded. Treated as application-shaped: ambiguous failures are
    /// surfaced rather than silently queued.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The local queue could not store the record. Distinct from a
    /// deferral: this is a data-loss risk.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SubmitError {
    /// Whether this failure implicates the network rather than the
    /// application, making the record safe to queue for replay
    pub fn is_network(&self) -> bool {
        matches!(self, SubmitError::Network(_))
    }
}

/// Errors from client-side record validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty
    #[error("{field} must not be empty")]
    Required {
        /// Name of the offending field
        field: &'static str,
    },

    /// A field exceeds its maximum length
    #[error("{field} exceeds {max} characters")]
    TooLong {
        /// Name of the offending field
        field: &'static str,
        /// Maximum allowed length
        max: usize,
    },

    /// Email is present but not plausibly an address
    #[error("Invalid email format")]
    InvalidEmail,

    /// A numeric field is outside its allowed range
    #[error("{field} must be within {min}..={max}")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },
}
