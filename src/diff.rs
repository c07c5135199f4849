//! Catalog differencer
//!
//! Compares a source catalog against a target catalog, bucket by bucket,
//! and streams every discrepancy into the diff report as it is found. The
//! comparison is one-directional: entries present only in the target are
//! not reported. Within a bucket, iteration follows the store's
//! lexicographic path order, so the report is deterministic for fixed
//! catalog contents.

use crate::config::Config;
use crate::error::Result;
use crate::report::{DiffStatus, ReportWriter};
use crate::store::schema::keys as schema_keys;
use crate::store::CatalogStore;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of one diff run
#[derive(Debug, Default)]
pub struct DiffStats {
    /// Entries reported missing from the target
    pub missing: u64,

    /// Entries whose fingerprints differ
    pub mismatched: u64,

    /// Buckets compared
    pub buckets_compared: u64,

    /// Buckets entirely absent from the target catalog
    pub missing_buckets: u64,
}

impl DiffStats {
    /// Total entries written to the report
    pub fn total(&self) -> u64 {
        self.missing + self.mismatched
    }
}

/// Diff a source catalog against the configured target catalog
///
/// Buckets are processed in sorted name order. A bucket missing from the
/// source is skipped; a bucket missing from the target is surfaced as a
/// bucket-level anomaly and every source entry in it is reported missing.
pub fn diff(config: &Config, source_path: &Path, report_path: &Path) -> Result<DiffStats> {
    let source = CatalogStore::open_readonly(source_path)?;
    let target = CatalogStore::open_readonly(&config.store_path)?;
    let mut writer = ReportWriter::create(report_path)?;

    // Catalogs built in different fingerprint modes can never match
    let source_mode = source.get_meta(schema_keys::FINGERPRINT_MODE)?;
    let target_mode = target.get_meta(schema_keys::FINGERPRINT_MODE)?;
    if source_mode != target_mode {
        warn!(
            source = source_mode.as_deref().unwrap_or("unknown"),
            target = target_mode.as_deref().unwrap_or("unknown"),
            "Catalogs use different fingerprint modes; every shared path will mismatch"
        );
    }

    let mut stats = DiffStats::default();

    for bucket in config.buckets.keys() {
        if !source.has_bucket(bucket)? {
            debug!(bucket, "Bucket not present in source catalog, skipping");
            continue;
        }
        stats.buckets_compared += 1;

        if !target.has_bucket(bucket)? {
            warn!(bucket, "Bucket is missing from the target catalog entirely");
            stats.missing_buckets += 1;

            source.for_each(bucket, |path, _| -> Result<()> {
                writer.append(bucket, path, DiffStatus::Missing)?;
                Ok(())
            })?;
            stats.missing += source.count(bucket)?;
            continue;
        }

        let (mut missing, mut mismatched) = (0u64, 0u64);
        source.for_each(bucket, |path, fingerprint| -> Result<()> {
            let verdict = match target.get(bucket, path)? {
                None => Some(DiffStatus::Missing),
                Some(ref theirs) if theirs != fingerprint => Some(DiffStatus::Mismatch),
                Some(_) => None,
            };
            if let Some(status) = verdict {
                writer.append(bucket, path, status)?;
                match status {
                    DiffStatus::Missing => missing += 1,
                    DiffStatus::Mismatch => mismatched += 1,
                }
            }
            Ok(())
        })?;
        stats.missing += missing;
        stats.mismatched += mismatched;
    }

    let entries = writer.finish()?;
    info!(
        entries,
        missing = stats.missing,
        mismatched = stats.mismatched,
        buckets = stats.buckets_compared,
        report = %report_path.display(),
        "Diff complete"
    );
    Ok(stats)
}
