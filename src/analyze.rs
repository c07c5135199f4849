//! Mismatch analyzer
//!
//! Re-validates a diff report against the live filesystem. A report
//! reflects catalog-time state, which may be stale by the time anyone
//! reads it: files may have been removed, replaced by symlinks, or turned
//! into directories since. Each entry is re-stat'd at its resolved
//! absolute path and excluded from the aggregate if it no longer is a
//! regular file.

use crate::config::Config;
use crate::error::Result;
use crate::fingerprint::{self, PathKind};
use crate::report::ReportReader;
use std::path::Path;
use tracing::{info, warn};

/// Bytes per reported gigabyte
const GB: u64 = 1 << 30;

/// Aggregate over the surviving entries of a diff report
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AnalyzeStats {
    /// Entries that still resolve to a regular file
    pub count: u64,

    /// Total byte size of those files
    pub total_bytes: u64,
}

impl AnalyzeStats {
    /// Total size in whole gigabytes
    pub fn total_gb(&self) -> u64 {
        self.total_bytes / GB
    }
}

/// Walk a diff report and aggregate count and size of surviving entries
pub fn analyze(config: &Config, report_path: &Path) -> Result<AnalyzeStats> {
    let reader = ReportReader::open(report_path)?;
    let mut stats = AnalyzeStats::default();

    reader.for_each(|entry| -> Result<()> {
        let abs = match config.resolve(&entry.bucket, &entry.path) {
            Ok(abs) => abs,
            Err(e) => {
                warn!(bucket = %entry.bucket, path = %entry.path, error = %e, "Cannot resolve entry, skipping");
                return Ok(());
            }
        };

        match fingerprint::classify(&abs) {
            Ok(PathKind::File) => {
                if let Ok(meta) = abs.symlink_metadata() {
                    stats.count += 1;
                    stats.total_bytes += meta.len();
                }
            }
            Ok(_) => {
                // Vanished, symlink, or directory: no longer a repair candidate
            }
            Err(e) => {
                warn!(path = %abs.display(), error = %e, "Cannot classify entry, skipping");
            }
        }
        Ok(())
    })?;

    info!(
        count = stats.count,
        total_bytes = stats.total_bytes,
        report = %report_path.display(),
        "Analysis complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FingerprintMode;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    fn config_with_bucket(bucket: &str, root: &Path) -> Config {
        let mut buckets = BTreeMap::new();
        buckets.insert(bucket.to_string(), root.to_path_buf());
        Config {
            store_path: root.join("unused.db"),
            buckets,
            incremental: false,
            workers: 2,
            mode: FingerprintMode::Digest,
        }
    }

    #[test]
    fn test_analyze_counts_surviving_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("b1");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("present.txt"), vec![1u8; 100]).unwrap();
        fs::write(root.join("also.txt"), vec![2u8; 50]).unwrap();

        let report = dir.path().join("report.csv");
        fs::write(
            &report,
            "b1,present.txt,missing\n\
             b1,also.txt,checksum wrong\n\
             b1,vanished.txt,missing\n",
        )
        .unwrap();

        let config = config_with_bucket("b1", &root);
        let stats = analyze(&config, &report).unwrap();

        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_bytes, 150);
        assert_eq!(stats.total_gb(), 0);
    }

    #[test]
    fn test_analyze_excludes_dirs_and_unknown_buckets() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("b1");
        fs::create_dir_all(root.join("a-directory")).unwrap();
        fs::write(root.join("f.txt"), b"x").unwrap();

        let report = dir.path().join("report.csv");
        fs::write(
            &report,
            "b1,a-directory,missing\n\
             b1,f.txt,missing\n\
             unknown-bucket,f.txt,missing\n",
        )
        .unwrap();

        let config = config_with_bucket("b1", &root);
        let stats = analyze(&config, &report).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_bytes, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_analyze_excludes_symlinks() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("b1");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("real.txt"), b"data").unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();

        let report = dir.path().join("report.csv");
        fs::write(&report, "b1,link.txt,missing\nb1,real.txt,missing\n").unwrap();

        let config = config_with_bucket("b1", &root);
        let stats = analyze(&config, &report).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_bytes, 4);
    }

    #[test]
    fn test_gb_granularity() {
        let stats = AnalyzeStats {
            count: 3,
            total_bytes: 5 * GB + 123,
        };
        assert_eq!(stats.total_gb(), 5);
    }
}
