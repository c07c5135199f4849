//! Batched catalog writer
//!
//! A dedicated thread owns the catalog store connection and receives
//! completed records from the fingerprint workers via a bounded channel.
//! Records accumulate into a batch that is committed as one transaction
//! when it reaches the configured size; the remainder is flushed at
//! shutdown. Batching exists purely for throughput, and each batch is
//! atomic: a crash mid-run loses at most the uncommitted tail.

use crate::error::{StoreError, StoreResult};
use crate::store::catalog::CatalogStore;
use crate::store::schema::keys;
use crate::store::CatalogRecord;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::error;

/// Message types sent to the writer thread
#[derive(Debug)]
pub enum WriterMessage {
    /// Insert a new record
    Record(CatalogRecord),

    /// Commit the current batch regardless of size
    Flush,

    /// Flush and stop the writer
    Shutdown,
}

/// Statistics about write operations
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Total records written
    pub records_written: AtomicU64,

    /// Total batches committed
    pub batches_committed: AtomicU64,
}

impl WriterStats {
    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Batches committed so far
    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }
}

/// Handle for sending records to the writer
#[derive(Clone)]
pub struct WriterHandle {
    sender: Sender<WriterMessage>,
    stats: Arc<WriterStats>,
}

impl WriterHandle {
    /// Send a record to be written
    pub fn send(&self, record: CatalogRecord) -> StoreResult<()> {
        self.sender
            .send(WriterMessage::Record(record))
            .map_err(|_| StoreError::ChannelClosed)
    }

    /// Request a flush of the pending batch
    pub fn flush(&self) -> StoreResult<()> {
        self.sender
            .send(WriterMessage::Flush)
            .map_err(|_| StoreError::ChannelClosed)
    }

    /// Get writer statistics
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}

/// Batched catalog writer that runs in its own thread
pub struct CatalogWriter {
    /// Thread handle
    handle: Option<JoinHandle<StoreResult<()>>>,

    /// Writer handle for sending records
    writer_handle: WriterHandle,
}

impl CatalogWriter {
    /// Spawn the writer thread over an opened catalog store
    ///
    /// The store connection moves into the thread; all writes for the
    /// duration of the scan flow through the returned handles.
    pub fn spawn(store: CatalogStore, batch_size: usize, channel_size: usize) -> StoreResult<Self> {
        let (sender, receiver) = bounded(channel_size);
        let stats = Arc::new(WriterStats::default());

        let writer_handle = WriterHandle {
            sender,
            stats: Arc::clone(&stats),
        };

        store.set_meta(keys::LAST_SCAN_START, &chrono::Utc::now().to_rfc3339())?;

        let stats_clone = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("catalog-writer".into())
            .spawn(move || writer_thread(store, receiver, stats_clone, batch_size))
            .map_err(|e| StoreError::Transaction(format!("Failed to spawn writer thread: {}", e)))?;

        Ok(Self {
            handle: Some(handle),
            writer_handle,
        })
    }

    /// Get a handle for sending records to the writer
    pub fn handle(&self) -> WriterHandle {
        self.writer_handle.clone()
    }

    /// Flush the remainder and wait for the writer to finish
    pub fn finish(mut self) -> StoreResult<()> {
        let _ = self.writer_handle.sender.send(WriterMessage::Shutdown);

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => {
                    return Err(StoreError::Transaction("Writer thread panicked".into()));
                }
            }
        }
        Ok(())
    }
}

/// Internal writer thread function
fn writer_thread(
    store: CatalogStore,
    receiver: Receiver<WriterMessage>,
    stats: Arc<WriterStats>,
    batch_size: usize,
) -> StoreResult<()> {
    let mut batch: Vec<CatalogRecord> = Vec::with_capacity(batch_size);

    loop {
        match receiver.recv() {
            Ok(WriterMessage::Record(record)) => {
                batch.push(record);
                if batch.len() >= batch_size {
                    flush_batch(&store, &mut batch, &stats);
                }
            }
            Ok(WriterMessage::Flush) => {
                flush_batch(&store, &mut batch, &stats);
            }
            Ok(WriterMessage::Shutdown) | Err(_) => {
                // Final flush; Err means every sender is gone
                flush_batch(&store, &mut batch, &stats);
                break;
            }
        }
    }

    store.set_meta(keys::LAST_SCAN_END, &chrono::Utc::now().to_rfc3339())?;
    Ok(())
}

/// Commit the current batch; an insert failure loses that batch only
fn flush_batch(store: &CatalogStore, batch: &mut Vec<CatalogRecord>, stats: &WriterStats) {
    if batch.is_empty() {
        return;
    }

    match store.insert_batch(batch) {
        Ok(()) => {
            stats
                .records_written
                .fetch_add(batch.len() as u64, Ordering::Relaxed);
            stats.batches_committed.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            error!(error = %e, records = batch.len(), "Failed to commit catalog batch");
        }
    }
    batch.clear();
}
