//! # Openday Outbox
//!
//! Durable offline queue for not-yet-submitted registration records.
//!
//! When a terminal cannot reach the backend, records land here and are
//! replayed once connectivity returns. The queue survives process
//! restarts, hands out store-assigned monotonically increasing ids, and
//! drains strictly oldest-first.
//!
//! ## Features
//!
//! - **OutboxStore trait**: Abstraction over queue storage
//! - **MemoryOutbox**: In-memory implementation for tests and simulation
//! - **FileOutbox**: Append-only-log implementation for production
//!
//! ## Example
//!
//! ```rust,ignore
//! use openday_outbox::{FileOutbox, OutboxStore};
//! use openday_core::RegistrationRecord;
//!
//! #[tokio::main]
//! async fn main() {
//!     let outbox: FileOutbox<RegistrationRecord> =
//!         FileOutbox::new("./terminal-data").await.unwrap();
//!
//!     let id = outbox
//!         .enqueue(RegistrationRecord::new("Zeynep", "Demir"))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(outbox.count().await.unwrap(), 1);
//!
//!     // Acknowledged by the backend: gone for good
//!     outbox.remove(id).await.unwrap();
//!     assert_eq!(outbox.count().await.unwrap(), 0);
//! }
//! ```

pub mod file;
pub mod memory;

// Re-exports
pub use file::FileOutbox;
pub use memory::MemoryOutbox;

// Re-export the error type the trait speaks
pub use openday_core::StorageError;

use async_trait::async_trait;
use openday_core::{PendingRecord, RecordId, RecordPayload};

/// Abstraction over durable queue storage
///
/// Every resident record represents a submission the backend has NOT
/// acknowledged. Implementations assign ids, preserve enqueue order, and
/// never reorder or mutate resident records on their own.
#[async_trait]
pub trait OutboxStore<P: RecordPayload>: Send + Sync {
    /// Store a new record, assigning the next id and the current timestamp
    ///
    /// Fails with [`StorageError::Unavailable`] when the backing store
    /// cannot accept writes; the caller must surface that the record was
    /// lost rather than swallowing it.
    async fn enqueue(&self, payload: P) -> Result<RecordId, StorageError>;

    /// All resident records, oldest first. Side-effect-free.
    async fn list_pending(&self) -> Result<Vec<PendingRecord<P>>, StorageError>;

    /// Number of resident records, without materializing them
    async fn count(&self) -> Result<usize, StorageError>;

    /// Delete the record with the given id
    ///
    /// Removing an absent id is a no-op, not an error: duplicate delete
    /// attempts after a replay race are safe.
    async fn remove(&self, id: RecordId) -> Result<(), StorageError>;

    /// Remove all records. An administrative escape hatch, not part of the
    /// normal flow.
    async fn clear(&self) -> Result<(), StorageError>;
}
