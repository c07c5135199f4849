//! Fingerprint worker pool
//!
//! Each worker pulls file tasks from a shared bounded channel, computes the
//! content fingerprint, and sends the completed record to the catalog
//! writer. Workers exit when the task channel closes and drains. Per-file
//! failures are logged and skipped; a file that vanished between traversal
//! and fingerprinting is not an error.

use crate::config::FingerprintMode;
use crate::error::WorkerError;
use crate::fingerprint;
use crate::store::{CatalogRecord, WriterHandle};
use crossbeam_channel::Receiver;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// A file waiting to be fingerprinted
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Bucket the file belongs to
    pub bucket: String,

    /// Path relative to the bucket root
    pub rel_path: String,

    /// Absolute path on local disk
    pub abs_path: PathBuf,
}

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Files successfully fingerprinted
    pub fingerprinted: AtomicU64,

    /// Bytes of file content fingerprinted
    pub bytes: AtomicU64,

    /// Files that vanished between traversal and fingerprinting
    pub vanished: AtomicU64,

    /// Unreadable files skipped
    pub errors: AtomicU64,
}

/// A worker thread that fingerprints files
pub struct FingerprintWorker {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl FingerprintWorker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        mode: FingerprintMode,
        tasks: Receiver<FileTask>,
        writer: WriterHandle,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("fingerprint-{}", id))
            .spawn(move || worker_loop(id, mode, tasks, writer, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker statistics
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| WorkerError::Panicked { id: self.id })?;
        }
        Ok(())
    }
}

/// Main worker loop: drain the task channel until it closes
fn worker_loop(
    id: usize,
    mode: FingerprintMode,
    tasks: Receiver<FileTask>,
    writer: WriterHandle,
    stats: Arc<WorkerStats>,
) {
    for task in tasks.iter() {
        let size = match task.abs_path.symlink_metadata() {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(worker = id, path = %task.abs_path.display(), "File vanished before fingerprinting");
                stats.vanished.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Err(e) => {
                warn!(worker = id, path = %task.abs_path.display(), error = %e, "Cannot stat file, skipping");
                stats.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        match fingerprint::compute(&task.abs_path, mode) {
            Ok(fp) => {
                let record = CatalogRecord {
                    bucket: task.bucket,
                    path: task.rel_path,
                    fingerprint: fp,
                };
                if let Err(e) = writer.send(record) {
                    // Writer is gone; nothing more this worker can do
                    error!(worker = id, error = %e, "Failed to send record to writer");
                    return;
                }
                stats.fingerprinted.fetch_add(1, Ordering::Relaxed);
                stats.bytes.fetch_add(size, Ordering::Relaxed);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(worker = id, path = %task.abs_path.display(), "File vanished during fingerprinting");
                stats.vanished.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(worker = id, path = %task.abs_path.display(), error = %e, "Fingerprint failed, skipping");
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Aggregate statistics from a pool of workers
pub fn aggregate_stats(stats: &[Arc<WorkerStats>]) -> (u64, u64, u64, u64) {
    let mut fingerprinted = 0u64;
    let mut bytes = 0u64;
    let mut vanished = 0u64;
    let mut errors = 0u64;

    for s in stats {
        fingerprinted += s.fingerprinted.load(Ordering::Relaxed);
        bytes += s.bytes.load(Ordering::Relaxed);
        vanished += s.vanished.load(Ordering::Relaxed);
        errors += s.errors.load(Ordering::Relaxed);
    }

    (fingerprinted, bytes, vanished, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FingerprintMode;
    use crate::store::{CatalogStore, CatalogWriter};
    use crossbeam_channel::bounded;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_worker_fingerprints_and_skips_vanished() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let file = dir.path().join("real.txt");
        fs::write(&file, b"content").unwrap();

        let store = CatalogStore::open(&db_path, FingerprintMode::Digest).unwrap();
        let writer = CatalogWriter::spawn(store, 10, 64).unwrap();

        let (tx, rx) = bounded(8);
        let worker =
            FingerprintWorker::spawn(0, FingerprintMode::Digest, rx, writer.handle()).unwrap();

        tx.send(FileTask {
            bucket: "b1".into(),
            rel_path: "real.txt".into(),
            abs_path: file,
        })
        .unwrap();
        tx.send(FileTask {
            bucket: "b1".into(),
            rel_path: "gone.txt".into(),
            abs_path: dir.path().join("gone.txt"),
        })
        .unwrap();
        drop(tx);

        let stats = worker.stats();
        worker.join().unwrap();
        writer.finish().unwrap();

        assert_eq!(stats.fingerprinted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.vanished.load(Ordering::Relaxed), 1);
        assert_eq!(stats.errors.load(Ordering::Relaxed), 0);

        let store = CatalogStore::open_readonly(&db_path).unwrap();
        assert_eq!(store.count("b1").unwrap(), 1);
        assert!(store.get("b1", "real.txt").unwrap().is_some());
    }
}
