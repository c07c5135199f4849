//! dirdiff - Catalog, Diff, and Repair for Large File Trees
//!
//! A tool for verifying that very large directory trees survived a
//! transfer intact, and for re-transferring what did not. Trees are
//! cataloged into persistent fingerprint stores, two catalogs are diffed
//! into a report of missing and mismatched files, and a resumable repair
//! queue drives a user-supplied transfer command for every discrepancy.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Bucket Roots                            │
//! │          (one configured directory tree per bucket)           │
//! └─────────────────────────────┬────────────────────────────────┘
//!                               │ walk
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Fingerprint Workers                        │
//! │   ┌─────────┐  ┌─────────┐         ┌─────────┐               │
//! │   │Worker 1 │  │Worker 2 │  ...    │Worker N │               │
//! │   │ SHA-256 │  │ SHA-256 │         │ SHA-256 │               │
//! │   └────┬────┘  └────┬────┘         └────┬────┘               │
//! │        └────────────┼────────────────────┘                   │
//! │                     ▼                                        │
//! │          ┌──────────────────────────┐                        │
//! │          │   Batched Store Writer   │                        │
//! │          │  (one txn per batch)     │                        │
//! │          └──────────┬───────────────┘                        │
//! └─────────────────────┼────────────────────────────────────────┘
//!                       ▼
//!     ┌──────────────┐     ┌──────────────┐
//!     │ Catalog  A   │ diff│ Catalog  B   │
//!     │ (source.db)  ├────►│ (catalog.db) │
//!     └──────────────┘     └──────┬───────┘
//!                                 ▼
//!                        diffresult.csv ──► repair queue ──► commands
//! ```
//!
//! # Pipeline
//!
//! - **scan**: walk each bucket root, fingerprint every regular file
//!   concurrently, batch records into the catalog store.
//! - **diff**: compare a source catalog against the configured one,
//!   streaming `missing` / `checksum wrong` lines into the report.
//! - **count** / **size**: re-validate a report against the live
//!   filesystem and aggregate what still needs repair.
//! - **repair**: turn the report into a persistent task queue, then drain
//!   it through a bounded pool of command executions; `--resume` picks up
//!   a crashed run without regenerating tasks.

pub mod analyze;
pub mod builder;
pub mod config;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod progress;
pub mod repair;
pub mod report;
pub mod store;

pub use config::{CliArgs, Command, Config, FingerprintMode};
pub use error::{DirdiffError, Result};
pub use store::{CatalogRecord, CatalogStore, RepairQueue, RepairTask};
