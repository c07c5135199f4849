//! Persistent stores
//!
//! Two logically distinct stores share the same SQLite-backed engine: the
//! catalog (one snapshot of fingerprints per store file) and the repair
//! queue (pending transfer tasks). Each store file is opened exclusively by
//! one process for the duration of a run; the transaction mechanism is the
//! sole mutual-exclusion primitive.

pub mod catalog;
pub mod queue;
pub mod schema;
pub mod writer;

pub use catalog::CatalogStore;
pub use queue::{RepairQueue, RepairTask};
pub use writer::{CatalogWriter, WriterHandle, WriterStats};

/// One cataloged file: a `(bucket, path)` key and its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    /// Bucket the file belongs to
    pub bucket: String,

    /// Path relative to the bucket root
    pub path: String,

    /// Content digest or decimal size, per the store's fingerprint mode
    pub fingerprint: String,
}
