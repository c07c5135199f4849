//! Configuration types for dirdiff
//!
//! This module defines:
//! - The YAML configuration file format (bucket map, store path, tuning knobs)
//! - Runtime configuration with validation
//! - CLI argument parsing using clap derive macros

use crate::error::{ConfigError, ConfigResult};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Batch size limits for store inserts
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 100_000;

/// Default number of records accumulated before a store transaction commits
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default number of repair tasks pulled from the queue per drain round
pub const DEFAULT_DRAIN_BATCH_SIZE: usize = 10_000;

/// Catalog file trees, diff the catalogs, repair the differences
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dirdiff",
    version,
    about = "Catalog file trees into fingerprint stores, diff them, and repair discrepancies",
    after_help = "EXAMPLES:\n    \
        dirdiff scan\n    \
        dirdiff diff source.db\n    \
        dirdiff count diffresult.csv\n    \
        dirdiff size diffresult.csv\n    \
        dirdiff repair diffresult.csv \"cp {ABSPATH} /mnt/target/{BUCKET}/{PATH}\"\n    \
        dirdiff repair diffresult.csv \"cp {ABSPATH} /mnt/target/{BUCKET}/{PATH}\" --resume"
)]
pub struct CliArgs {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Path to the YAML configuration file
    #[arg(
        short = 'c',
        long,
        default_value = "config.yml",
        value_name = "FILE",
        global = true
    )]
    pub config: PathBuf,

    /// Verbose output (debug-level logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// Subcommands, one per pipeline verb
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Walk the configured bucket roots and build the catalog store
    Scan {
        /// Records per store transaction
        #[arg(short = 'b', long, default_value_t = DEFAULT_BATCH_SIZE, value_name = "NUM")]
        batch_size: usize,
    },

    /// Diff a source catalog against the configured catalog
    Diff {
        /// Source catalog store to diff from
        #[arg(value_name = "SOURCE_DB")]
        source: PathBuf,

        /// Diff report output file
        #[arg(short = 'o', long, default_value = "diffresult.csv", value_name = "FILE")]
        report: PathBuf,
    },

    /// Count surviving entries in a diff report against the live filesystem
    Count {
        /// Diff report to analyze
        #[arg(value_name = "REPORT")]
        report: PathBuf,
    },

    /// Sum surviving entry sizes in a diff report against the live filesystem
    Size {
        /// Diff report to analyze
        #[arg(value_name = "REPORT")]
        report: PathBuf,
    },

    /// Re-run a transfer command for every entry in a diff report
    Repair {
        /// Diff report to generate repair tasks from
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Command template; {BUCKET}, {PATH} and {ABSPATH} are substituted
        #[arg(value_name = "TEMPLATE")]
        template: String,

        /// Resume a previous repair run without regenerating tasks
        #[arg(long)]
        resume: bool,

        /// Repair queue store file
        #[arg(long, default_value = "repair.db", value_name = "FILE")]
        queue: PathBuf,
    },
}

/// On-disk YAML configuration
///
/// ```yaml
/// db: catalog.db
/// dirs:
///   pool-a: /mnt/pool1/pool-a
///   pool-b: /mnt/pool1/pool-b
/// first-run: true
/// workers: 8
/// checksum: true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    /// Catalog store path
    db: String,

    /// Bucket name -> root directory
    dirs: BTreeMap<String, PathBuf>,

    /// Full scan (true) vs incremental skip of already-cataloged paths (false)
    #[serde(rename = "first-run", default = "default_first_run")]
    first_run: bool,

    /// Worker pool size shared by the fingerprint and repair stages
    #[serde(default = "default_workers")]
    workers: usize,

    /// Content digest fingerprints (true) vs file-size fingerprints (false)
    #[serde(default = "default_checksum")]
    checksum: bool,
}

fn default_first_run() -> bool {
    true
}

fn default_workers() -> usize {
    2
}

fn default_checksum() -> bool {
    true
}

/// Fingerprint mode recorded store-wide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintMode {
    /// SHA-256 content digest
    Digest,
    /// Decimal file size
    Size,
}

impl FingerprintMode {
    /// Stable name persisted in the store metadata table
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintMode::Digest => "digest",
            FingerprintMode::Size => "size",
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog store path
    pub store_path: PathBuf,

    /// Bucket name -> root directory, sorted by bucket name
    pub buckets: BTreeMap<String, PathBuf>,

    /// Skip fingerprinting for paths already present in the store
    pub incremental: bool,

    /// Worker pool size
    pub workers: usize,

    /// Fingerprint mode
    pub mode: FingerprintMode,
}

impl Config {
    /// Load and validate the configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let data = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file: ConfigFile =
            serde_yaml::from_str(&data).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> ConfigResult<Self> {
        if file.db.is_empty() {
            return Err(ConfigError::NoStorePath);
        }
        if file.dirs.is_empty() {
            return Err(ConfigError::NoBuckets);
        }
        if file.workers == 0 || file.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: file.workers,
                max: MAX_WORKERS,
            });
        }

        Ok(Self {
            store_path: PathBuf::from(file.db),
            buckets: file.dirs,
            incremental: !file.first_run,
            workers: file.workers,
            mode: if file.checksum {
                FingerprintMode::Digest
            } else {
                FingerprintMode::Size
            },
        })
    }

    /// Root directory for a bucket, if configured
    pub fn bucket_root(&self, bucket: &str) -> Option<&Path> {
        self.buckets.get(bucket).map(PathBuf::as_path)
    }

    /// Resolve a bucket-relative path against its configured root
    pub fn resolve(&self, bucket: &str, rel_path: &str) -> ConfigResult<PathBuf> {
        let root = self
            .bucket_root(bucket)
            .ok_or_else(|| ConfigError::UnknownBucket {
                bucket: bucket.to_string(),
            })?;
        Ok(root.join(rel_path))
    }
}

/// Validate a batch size supplied on the command line
pub fn validate_batch_size(size: usize) -> ConfigResult<usize> {
    if size < MIN_BATCH_SIZE || size > MAX_BATCH_SIZE {
        return Err(ConfigError::InvalidBatchSize {
            size,
            min: MIN_BATCH_SIZE,
            max: MAX_BATCH_SIZE,
        });
    }
    Ok(size)
}
