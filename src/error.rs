//! Error types for dirdiff
//!
//! This module defines the error hierarchy that covers:
//! - Catalog store and repair queue errors
//! - Configuration loading and validation errors
//! - Worker thread and channel errors
//! - Diff report reading/writing errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Fatal errors (a store or report that cannot be opened) abort the run;
//!   item-level errors are logged at the point of occurrence and skipped
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the dirdiff application
#[derive(Error, Debug)]
pub enum DirdiffError {
    /// Store errors (catalog or repair queue)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Diff report errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Catalog store and repair queue errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to create or open the store file
    #[error("Failed to open store at '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Store was created with a different fingerprint mode
    #[error("Store at '{path}' uses fingerprint mode '{stored}', configured mode is '{configured}'")]
    ModeMismatch {
        path: PathBuf,
        stored: String,
        configured: String,
    },

    /// Writer channel closed unexpectedly
    #[error("Store writer channel closed unexpectedly")]
    ChannelClosed,

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read config file '{path}': {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// Config file could not be parsed
    #[error("Cannot parse config file '{path}': {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// No buckets configured
    #[error("No bucket directories configured")]
    NoBuckets,

    /// Store path missing
    #[error("No store path ('db') configured")]
    NoStorePath,

    /// Bucket not present in the configuration
    #[error("Bucket '{bucket}' is not configured")]
    UnknownBucket { bucket: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },

    /// Worker initialization failed
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Result channel closed unexpectedly
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

/// Diff report errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// Report file could not be created
    #[error("Failed to create report at '{path}': {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// Report file could not be opened for reading
    #[error("Failed to open report at '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// I/O error while writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for DirdiffError {
    fn from(e: rusqlite::Error) -> Self {
        DirdiffError::Store(StoreError::Sqlite(e))
    }
}

/// Result type alias for DirdiffError
pub type Result<T> = std::result::Result<T, DirdiffError>;

/// Result type alias for StoreError
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for ReportError
pub type ReportResult<T> = std::result::Result<T, ReportError>;
