//! Catalog builder
//!
//! Walks every configured bucket root, fingerprints each regular file, and
//! batches the records into the catalog store. In digest mode a bounded
//! pool of fingerprint workers sits between the traversal and the single
//! writer thread; in size mode the traversal already has everything it
//! needs and feeds the writer directly.
//!
//! Traversal errors on individual entries are logged and skipped, never
//! fatal to the bucket. In incremental mode a `(bucket, path)` key already
//! present in the store is skipped without recomputation; the catalog then
//! reflects only files new since the last pass.

pub mod worker;

use crate::config::{Config, FingerprintMode};
use crate::error::{Result, WorkerError};
use crate::progress::ProgressReporter;
use crate::store::{CatalogRecord, CatalogStore, CatalogWriter};
use crossbeam_channel::bounded;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use walkdir::WalkDir;
use worker::{aggregate_stats, FileTask, FingerprintWorker};

/// Capacity of the traversal -> worker task channel
const TASK_QUEUE_SIZE: usize = 1024;

/// Capacity of the worker -> writer record channel
const WRITER_QUEUE_SIZE: usize = 1024;

/// Outcome of one catalog build
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Records durably written to the store
    pub cataloged: u64,

    /// Paths skipped because they were already cataloged (incremental mode)
    pub skipped_existing: u64,

    /// Bytes of file content fingerprinted
    pub bytes_fingerprinted: u64,

    /// Files that vanished mid-scan
    pub vanished: u64,

    /// Item-level errors (unreadable entries), logged and skipped
    pub errors: u64,

    /// Wall-clock duration of the scan
    pub duration: Duration,
}

/// Counters accumulated by the traversal itself
#[derive(Debug, Default)]
struct TraversalStats {
    skipped_existing: u64,
    errors: u64,
}

/// Build the catalog for every configured bucket
pub fn build(
    config: &Config,
    batch_size: usize,
    progress: Option<&ProgressReporter>,
) -> Result<ScanStats> {
    let started = Instant::now();

    let store = CatalogStore::open(&config.store_path, config.mode)?;
    store.create_buckets(config.buckets.keys().map(String::as_str))?;

    // Incremental lookups need their own connection: the write connection
    // moves into the writer thread for the duration of the scan.
    let reader = if config.incremental {
        Some(CatalogStore::open(&config.store_path, config.mode)?)
    } else {
        None
    };

    let writer = CatalogWriter::spawn(store, batch_size, WRITER_QUEUE_SIZE)?;
    let writer_handle = writer.handle();

    let mut traversal = TraversalStats::default();
    let mut stats = ScanStats::default();

    match config.mode {
        FingerprintMode::Digest => {
            let (task_tx, task_rx) = bounded::<FileTask>(TASK_QUEUE_SIZE);

            let workers = (0..config.workers)
                .map(|id| {
                    FingerprintWorker::spawn(id, config.mode, task_rx.clone(), writer.handle())
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            drop(task_rx);

            for (bucket, root) in &config.buckets {
                if let Some(p) = progress {
                    p.set_status(&format!("Scanning bucket '{}'", bucket));
                }
                walk_bucket(bucket, root, reader.as_ref(), &mut traversal, |rel, entry| {
                    let task = FileTask {
                        bucket: bucket.clone(),
                        rel_path: rel,
                        abs_path: entry.path().to_path_buf(),
                    };
                    task_tx.send(task).map_err(|_| WorkerError::ChannelClosed)?;
                    Ok(())
                })?;
            }

            // Close the intake side; workers drain the channel and exit
            drop(task_tx);

            let worker_stats: Vec<_> = workers.iter().map(FingerprintWorker::stats).collect();
            for w in workers {
                w.join()?;
            }

            let (fingerprinted, bytes, vanished, errors) = aggregate_stats(&worker_stats);
            info!(fingerprinted, vanished, errors, "Fingerprint workers finished");
            stats.bytes_fingerprinted = bytes;
            stats.vanished = vanished;
            stats.errors += errors;
        }
        FingerprintMode::Size => {
            // Size fingerprints come straight from traversal metadata; no
            // worker pool is needed between the walk and the writer.
            for (bucket, root) in &config.buckets {
                if let Some(p) = progress {
                    p.set_status(&format!("Scanning bucket '{}'", bucket));
                }
                walk_bucket(bucket, root, reader.as_ref(), &mut traversal, |rel, entry| {
                    let size = match entry.metadata() {
                        Ok(meta) => meta.len(),
                        Err(e) => {
                            warn!(path = %entry.path().display(), error = %e, "Cannot stat file, skipping");
                            return Ok(());
                        }
                    };
                    writer_handle.send(CatalogRecord {
                        bucket: bucket.clone(),
                        path: rel,
                        fingerprint: size.to_string(),
                    })?;
                    stats.bytes_fingerprinted += size;
                    Ok(())
                })?;
            }
        }
    }

    writer.finish()?;

    stats.cataloged = writer_handle.stats().records_written();
    stats.skipped_existing = traversal.skipped_existing;
    stats.errors += traversal.errors;
    stats.duration = started.elapsed();

    info!(
        cataloged = stats.cataloged,
        skipped = stats.skipped_existing,
        errors = stats.errors,
        "Catalog build complete"
    );
    Ok(stats)
}

/// Walk one bucket root, feeding each eligible regular file to `sink`
///
/// Directories and symlinks are skipped by classification; unreadable
/// entries are logged and skipped. The relative path is anchored at the
/// bucket root.
fn walk_bucket(
    bucket: &str,
    root: &Path,
    reader: Option<&CatalogStore>,
    traversal: &mut TraversalStats,
    mut sink: impl FnMut(String, &walkdir::DirEntry) -> Result<()>,
) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(bucket, error = %e, "Traversal error, skipping entry");
                traversal.errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(e) => {
                warn!(bucket, path = %entry.path().display(), error = %e, "Cannot relativize path, skipping");
                traversal.errors += 1;
                continue;
            }
        };

        if let Some(store) = reader {
            match store.contains(bucket, &rel) {
                Ok(true) => {
                    traversal.skipped_existing += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(bucket, path = %rel, error = %e, "Incremental lookup failed, refingerprinting");
                }
            }
        }

        sink(rel, &entry)?;
    }
    Ok(())
}
