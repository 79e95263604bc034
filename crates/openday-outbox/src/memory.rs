//! In-memory queue implementation
//!
//! Suitable for tests and simulation; nothing survives a restart.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, trace};

use openday_core::{PendingRecord, RecordId, RecordPayload, StorageError};

use crate::OutboxStore;

/// In-memory implementation of [`OutboxStore`]
#[derive(Debug)]
pub struct MemoryOutbox<P> {
    /// Resident records keyed by id
    records: DashMap<RecordId, PendingRecord<P>>,
    /// Next id to assign
    next_id: AtomicU64,
}

impl<P> Default for MemoryOutbox<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MemoryOutbox<P> {
    /// Create an empty in-memory outbox
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Whether any records are waiting
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl<P: RecordPayload> OutboxStore<P> for MemoryOutbox<P> {
    async fn enqueue(&self, payload: P) -> Result<RecordId, StorageError> {
        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = PendingRecord::new(id, payload, Utc::now());
        trace!(record = %id, "Enqueueing record");
        self.records.insert(id, record);
        Ok(id)
    }

    async fn list_pending(&self) -> Result<Vec<PendingRecord<P>>, StorageError> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| (r.enqueued_at, r.id));
        Ok(records)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }

    async fn remove(&self, id: RecordId) -> Result<(), StorageError> {
        if self.records.remove(&id).is_some() {
            trace!(record = %id, "Removed record");
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.records.clear();
        debug!("Cleared all queued records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_assigns_monotonic_ids() {
        let outbox = MemoryOutbox::new();

        let first = outbox.enqueue("a".to_string()).await.unwrap();
        let second = outbox.enqueue("b".to_string()).await.unwrap();
        let third = outbox.enqueue("c".to_string()).await.unwrap();

        assert!(first < second);
        assert!(second < third);
        assert_eq!(outbox.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_pending_is_fifo() {
        let outbox = MemoryOutbox::new();

        for name in ["a", "b", "c", "d"] {
            outbox.enqueue(name.to_string()).await.unwrap();
        }

        let pending = outbox.list_pending().await.unwrap();
        let payloads: Vec<_> = pending.iter().map(|r| r.payload.as_str()).collect();
        assert_eq!(payloads, ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_fifo_survives_interleaved_removals() {
        let outbox = MemoryOutbox::new();

        let ids: Vec<_> = {
            let mut ids = Vec::new();
            for name in ["a", "b", "c", "d", "e"] {
                ids.push(outbox.enqueue(name.to_string()).await.unwrap());
            }
            ids
        };

        // Remove the middle and the first
        outbox.remove(ids[2]).await.unwrap();
        outbox.remove(ids[0]).await.unwrap();

        let pending = outbox.list_pending().await.unwrap();
        let payloads: Vec<_> = pending.iter().map(|r| r.payload.as_str()).collect();
        assert_eq!(payloads, ["b", "d", "e"]);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let outbox = MemoryOutbox::new();
        let id = outbox.enqueue("a".to_string()).await.unwrap();

        outbox.remove(id).await.unwrap();
        // Second removal of the same id must be a silent no-op
        outbox.remove(id).await.unwrap();

        assert_eq!(outbox.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_absent_id_is_noop() {
        let outbox: MemoryOutbox<String> = MemoryOutbox::new();
        outbox.remove(RecordId::new(999)).await.unwrap();
        assert_eq!(outbox.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let outbox = MemoryOutbox::new();
        for i in 0..10 {
            outbox.enqueue(format!("record-{i}")).await.unwrap();
        }

        outbox.clear().await.unwrap();

        assert_eq!(outbox.count().await.unwrap(), 0);
        assert!(outbox.list_pending().await.unwrap().is_empty());
    }
}
