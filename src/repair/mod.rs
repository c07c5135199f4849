//! Repair queue population and draining
//!
//! On a fresh run, every entry of the diff report becomes a task in the
//! persistent repair queue (batched inserts, entries whose source is no
//! longer a regular file are skipped at generation time). The queue is
//! then drained: read a batch of pending tasks in bucket-then-path order,
//! execute each task's command through a bounded worker pool, and delete
//! the whole batch in one transaction only after every command in it has
//! returned.
//!
//! A resumed run (`--resume`) skips population entirely and re-enters the
//! drain loop against whatever tasks remain, which is what makes a crashed
//! repair recoverable. Tasks in a batch whose deletion never committed are
//! re-executed verbatim on resume; the repair command must tolerate being
//! run twice for the same file.

pub mod command;

use crate::config::{Config, DEFAULT_BATCH_SIZE, DEFAULT_DRAIN_BATCH_SIZE};
use crate::error::{Result, WorkerError};
use crate::fingerprint::{self, PathKind};
use crate::report::ReportReader;
use crate::store::{RepairQueue, RepairTask};
use crossbeam_channel::bounded;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Outcome of one repair run
#[derive(Debug, Default)]
pub struct RepairStats {
    /// Tasks inserted into the queue (zero on a resumed run)
    pub generated: u64,

    /// Report entries skipped at generation time (source no longer a file)
    pub skipped_entries: u64,

    /// Commands executed
    pub executed: u64,

    /// Commands that failed (logged, tasks still retired)
    pub command_failures: u64,

    /// Drain batches processed
    pub batches: u64,
}

/// Run the repair stage: populate the queue from a report, then drain it
///
/// With `resume` set, population is skipped and the drain loop picks up
/// whatever tasks a previous run left pending.
pub fn repair(
    config: &Config,
    report_path: &Path,
    queue_path: &Path,
    template: &str,
    resume: bool,
) -> Result<RepairStats> {
    let queue = RepairQueue::open(queue_path)?;
    let mut stats = RepairStats::default();

    if resume {
        info!(
            pending = queue.len()?,
            queue = %queue_path.display(),
            "Resuming repair against existing queue"
        );
    } else {
        populate(config, report_path, &queue, &mut stats)?;
    }

    drain(&queue, template, config.workers, &mut stats)?;

    info!(
        executed = stats.executed,
        failures = stats.command_failures,
        batches = stats.batches,
        "Repair complete"
    );
    Ok(stats)
}

/// Generate repair tasks from a diff report, batching inserts
fn populate(
    config: &Config,
    report_path: &Path,
    queue: &RepairQueue,
    stats: &mut RepairStats,
) -> Result<()> {
    info!(report = %report_path.display(), "Generating repair tasks");
    let reader = ReportReader::open(report_path)?;

    let mut batch: Vec<RepairTask> = Vec::with_capacity(DEFAULT_BATCH_SIZE);
    let mut generated = 0u64;
    let mut skipped = 0u64;

    reader.for_each(|entry| -> Result<()> {
        let abs = match config.resolve(&entry.bucket, &entry.path) {
            Ok(abs) => abs,
            Err(e) => {
                warn!(bucket = %entry.bucket, path = %entry.path, error = %e, "Cannot resolve entry, skipping");
                skipped += 1;
                return Ok(());
            }
        };

        match fingerprint::classify(&abs) {
            Ok(PathKind::File) => {}
            Ok(kind) => {
                debug!(path = %abs.display(), ?kind, "Source is not a regular file, skipping");
                skipped += 1;
                return Ok(());
            }
            Err(e) => {
                warn!(path = %abs.display(), error = %e, "Cannot classify source, skipping");
                skipped += 1;
                return Ok(());
            }
        }

        batch.push(RepairTask {
            bucket: entry.bucket,
            path: entry.path,
            abs_path: abs.to_string_lossy().into_owned(),
        });
        if batch.len() >= DEFAULT_BATCH_SIZE {
            queue.insert_batch(&batch)?;
            generated += batch.len() as u64;
            batch.clear();
        }
        Ok(())
    })?;

    if !batch.is_empty() {
        queue.insert_batch(&batch)?;
        generated += batch.len() as u64;
    }

    stats.generated = generated;
    stats.skipped_entries = skipped;
    info!(generated, skipped, "Task generation complete");
    Ok(())
}

/// Drain the queue: execute and retire batches until a read comes back empty
fn drain(
    queue: &RepairQueue,
    template: &str,
    workers: usize,
    stats: &mut RepairStats,
) -> Result<()> {
    loop {
        let batch = queue.read_batch(DEFAULT_DRAIN_BATCH_SIZE)?;
        if batch.is_empty() {
            break;
        }
        stats.batches += 1;

        let failures = execute_batch(&batch, template, workers)?;
        stats.executed += batch.len() as u64;
        stats.command_failures += failures;

        // Only now, with every command in the batch returned, is the batch
        // retired. A crash before this commit leaves it pending for resume.
        queue.delete_batch(&batch)?;
        debug!(
            batch = stats.batches,
            tasks = batch.len(),
            failures,
            "Batch retired"
        );
    }
    Ok(())
}

/// Execute every task in a batch through a bounded worker pool
///
/// Returns the number of failed commands. A failure never aborts the
/// batch; at-least-once, best-effort is the contract.
fn execute_batch(batch: &[RepairTask], template: &str, workers: usize) -> Result<u64> {
    let (task_tx, task_rx) = bounded::<RepairTask>(workers);
    let failures = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..workers)
        .map(|id| {
            let task_rx = task_rx.clone();
            let template = template.to_string();
            let failures = Arc::clone(&failures);

            thread::Builder::new()
                .name(format!("repair-{}", id))
                .spawn(move || {
                    for task in task_rx.iter() {
                        match command::execute(&template, &task) {
                            Ok(status) if status.success() => {}
                            Ok(status) => {
                                warn!(
                                    bucket = %task.bucket,
                                    path = %task.path,
                                    %status,
                                    "Repair command failed"
                                );
                                failures.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                warn!(
                                    bucket = %task.bucket,
                                    path = %task.path,
                                    error = %e,
                                    "Repair command could not be run"
                                );
                                failures.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                })
                .map_err(|e| WorkerError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                })
        })
        .collect::<std::result::Result<_, _>>()?;
    drop(task_rx);

    for task in batch {
        task_tx
            .send(task.clone())
            .map_err(|_| WorkerError::ChannelClosed)?;
    }
    drop(task_tx);

    for (id, handle) in handles.into_iter().enumerate() {
        handle
            .join()
            .map_err(|_| WorkerError::Panicked { id })?;
    }

    Ok(failures.load(Ordering::Relaxed))
}
