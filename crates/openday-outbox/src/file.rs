//! File-backed queue implementation
//!
//! Uses an append-only log for durability, with an in-memory map for fast
//! access. The log is replayed on open to reconstruct resident records and
//! the id counter, so queued submissions survive a full process restart.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use openday_core::{PendingRecord, RecordId, RecordPayload, StorageError};

use crate::OutboxStore;

/// Entry type in the append-only log
#[derive(Debug, Clone, Serialize, Deserialize)]
enum LogEntry<P> {
    /// A record entered the queue
    Enqueue {
        /// The full record, id and timestamp included
        record: PendingRecord<P>,
    },
    /// A record was acknowledged and left the queue
    Remove {
        /// Id of the acknowledged record
        id: RecordId,
    },
    /// The queue was wiped administratively
    Clear,
}

/// File-backed implementation of [`OutboxStore`]
///
/// The log entry is written before the in-memory state mutates, so a crash
/// between the two leaves the log ahead of memory, never behind: replay
/// reconstructs at least every record the caller was told was stored.
#[derive(Debug)]
pub struct FileOutbox<P> {
    /// Directory holding the log file
    storage_path: PathBuf,
    /// In-memory cache of resident records
    records: DashMap<RecordId, PendingRecord<P>>,
    /// Next id to assign; recovered as highest replayed id + 1
    next_id: AtomicU64,
    /// Write handle for the append-only log
    writer: Arc<RwLock<Option<BufWriter<File>>>>,
    /// Whether to flush every write (durability vs throughput)
    sync_writes: bool,
}

impl<P: RecordPayload> FileOutbox<P> {
    /// Open (or create) an outbox at the given directory
    pub async fn new(storage_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::with_options(storage_path, true).await
    }

    /// Open with explicit sync behavior
    pub async fn with_options(
        storage_path: impl AsRef<Path>,
        sync_writes: bool,
    ) -> Result<Self, StorageError> {
        let storage_path = storage_path.as_ref().to_path_buf();

        tokio::fs::create_dir_all(&storage_path).await?;

        let outbox = Self {
            storage_path,
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
            writer: Arc::new(RwLock::new(None)),
            sync_writes,
        };

        outbox.load().await?;
        outbox.open_writer().await?;

        Ok(outbox)
    }

    /// Path of the log file
    fn log_path(&self) -> PathBuf {
        self.storage_path.join("outbox.log")
    }

    /// Replay existing log entries into memory
    async fn load(&self) -> Result<(), StorageError> {
        let log_path = self.log_path();

        if !log_path.exists() {
            debug!(path = ?log_path, "No existing outbox log, starting fresh");
            return Ok(());
        }

        info!(path = ?log_path, "Replaying outbox log");

        let file = File::open(&log_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut replayed = 0;
        let mut errors = 0;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            match BASE64
                .decode(line.trim())
                .ok()
                .and_then(|bytes| postcard::from_bytes::<LogEntry<P>>(&bytes).ok())
            {
                Some(entry) => {
                    self.apply_entry(entry);
                    replayed += 1;
                }
                None => {
                    errors += 1;
                    warn!("Skipping unparseable outbox log entry");
                }
            }
        }

        // Continue the id sequence above everything ever replayed
        let highest = self
            .records
            .iter()
            .map(|r| r.key().value())
            .max()
            .unwrap_or(0);
        self.next_id
            .store(highest.saturating_add(1), Ordering::SeqCst);

        info!(
            replayed,
            errors,
            pending = self.records.len(),
            "Finished replaying outbox log"
        );

        Ok(())
    }

    /// Apply one log entry to the in-memory state
    fn apply_entry(&self, entry: LogEntry<P>) {
        match entry {
            LogEntry::Enqueue { record } => {
                self.records.insert(record.id, record);
            }
            LogEntry::Remove { id } => {
                self.records.remove(&id);
            }
            LogEntry::Clear => {
                self.records.clear();
            }
        }
    }

    /// Open the log file for appending
    async fn open_writer(&self) -> Result<(), StorageError> {
        let log_path = self.log_path();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await?;

        *self.writer.write().await = Some(BufWriter::new(file));

        debug!(path = ?log_path, "Opened outbox log for writing");
        Ok(())
    }

    /// Append one entry to the log
    ///
    /// Write failures surface as [`StorageError::Unavailable`]: the caller
    /// was not able to durably store the mutation.
    async fn write_entry(&self, entry: &LogEntry<P>) -> Result<(), StorageError> {
        let bytes =
            postcard::to_allocvec(entry).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let encoded = BASE64.encode(&bytes);

        let mut guard = self.writer.write().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| StorageError::Unavailable("outbox log not open".to_string()))?;

        let result = async {
            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            if self.sync_writes {
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        result.map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    /// Flush buffered writes to disk
    pub async fn flush(&self) -> Result<(), StorageError> {
        let mut guard = self.writer.write().await;
        if let Some(writer) = guard.as_mut() {
            writer.flush().await?;
        }
        Ok(())
    }

    /// Rewrite the log to contain only resident records
    ///
    /// Removals and clears accumulate in the log forever otherwise. Writes
    /// the live set to a temp file and atomically renames it into place.
    pub async fn compact(&self) -> Result<(), StorageError> {
        let log_path = self.log_path();
        let temp_path = self.storage_path.join("outbox.log.tmp");

        info!("Compacting outbox log");

        {
            let file = File::create(&temp_path).await?;
            let mut writer = BufWriter::new(file);

            let mut live: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
            live.sort_by_key(|r| (r.enqueued_at, r.id));

            for record in live {
                let entry = LogEntry::Enqueue { record };
                let bytes = postcard::to_allocvec(&entry)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                writer.write_all(BASE64.encode(&bytes).as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await?;
        }

        // Close the current writer before replacing the file under it
        *self.writer.write().await = None;

        tokio::fs::rename(&temp_path, &log_path).await?;

        self.open_writer().await?;

        info!(pending = self.records.len(), "Outbox log compaction complete");

        Ok(())
    }

    /// Whether any records are waiting
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl<P: RecordPayload> OutboxStore<P> for FileOutbox<P> {
    async fn enqueue(&self, payload: P) -> Result<RecordId, StorageError> {
        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = PendingRecord::new(id, payload, Utc::now());
        trace!(record = %id, "Enqueueing record (file)");

        // Log first, memory second
        let entry = LogEntry::Enqueue {
            record: record.clone(),
        };
        self.write_entry(&entry).await?;

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
        if !self.records.contains_key(&id) {
            return Ok(());
        }
        trace!(record = %id, "Removing record (file)");

        self.write_entry(&LogEntry::Remove { id }).await?;
        self.records.remove(&id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.write_entry(&LogEntry::Clear).await?;
        self.records.clear();
        debug!("Cleared all queued records (file)");
        Ok(())
    }
}
