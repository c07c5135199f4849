//! The catalog store: a durable `(bucket, path) -> fingerprint` map
//!
//! One store instance represents one snapshot of the configured trees.
//! Records are inserted in atomic batches; a crash between batches leaves
//! the store consistent up to the last committed batch. Records are never
//! deleted, and in incremental mode a path already present is never
//! recomputed or overwritten.

use crate::config::FingerprintMode;
use crate::error::{StoreError, StoreResult};
use crate::store::schema::{self, keys};
use crate::store::CatalogRecord;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// A handle on one catalog store file
#[derive(Debug)]
pub struct CatalogStore {
    conn: Connection,
    path: PathBuf,
}

impl CatalogStore {
    /// Open (creating if absent) a catalog store for writing
    ///
    /// Records the fingerprint mode on first creation. Reopening an
    /// existing store with a conflicting configured mode is fatal: a single
    /// store never mixes digest and size fingerprints.
    pub fn open(path: &Path, mode: FingerprintMode) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        schema::create_catalog(&conn)?;

        match schema::get_catalog_info(&conn, keys::FINGERPRINT_MODE)? {
            Some(stored) if stored != mode.as_str() => {
                return Err(StoreError::ModeMismatch {
                    path: path.to_path_buf(),
                    stored,
                    configured: mode.as_str().to_string(),
                });
            }
            Some(_) => {}
            None => {
                schema::set_catalog_info(&conn, keys::FINGERPRINT_MODE, mode.as_str())?;
                schema::set_catalog_info(
                    &conn,
                    keys::SCHEMA_VERSION,
                    &schema::SCHEMA_VERSION.to_string(),
                )?;
                schema::set_catalog_info(&conn, keys::TOOL_VERSION, env!("CARGO_PKG_VERSION"))?;
            }
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing catalog store read-only
    ///
    /// Fails if the file does not exist; a diff against a store that was
    /// never built is a setup error, not an empty result.
    pub fn open_readonly(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// The underlying store file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register bucket names, creating any that are absent
    pub fn create_buckets<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO buckets (name) VALUES (?1)")?;
            for name in names {
                stmt.execute([name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Whether a bucket has been registered in this store
    pub fn has_bucket(&self, bucket: &str) -> StoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM buckets WHERE name = ?1",
            [bucket],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Point lookup of a record's fingerprint
    pub fn get(&self, bucket: &str, path: &str) -> StoreResult<Option<String>> {
        let result = self.conn.query_row(
            "SELECT fingerprint FROM records WHERE bucket = ?1 AND path = ?2",
            [bucket, path],
            |row| row.get(0),
        );

        match result {
            Ok(fp) => Ok(Some(fp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a `(bucket, path)` key is already cataloged
    pub fn contains(&self, bucket: &str, path: &str) -> StoreResult<bool> {
        Ok(self.get(bucket, path)?.is_some())
    }

    /// Insert a batch of records in one durable transaction
    ///
    /// Either every record in the batch becomes visible or none does.
    pub fn insert_batch(&self, records: &[CatalogRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO records (bucket, path, fingerprint) VALUES (?1, ?2, ?3)",
            )?;
            for record in records {
                stmt.execute(params![record.bucket, record.path, record.fingerprint])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Iterate a bucket's records in lexicographic path order
    ///
    /// Streams rows through the callback so that a bucket of any size can
    /// be walked without materializing it in memory. Generic over the
    /// caller's error type so that callbacks can write reports as they go.
    pub fn for_each<E: From<rusqlite::Error>>(
        &self,
        bucket: &str,
        mut f: impl FnMut(&str, &str) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, fingerprint FROM records WHERE bucket = ?1 ORDER BY path",
        )?;
        let mut rows = stmt.query([bucket])?;
        while let Some(row) = rows.next()? {
            let path: String = row.get(0)?;
            let fingerprint: String = row.get(1)?;
            f(&path, &fingerprint)?;
        }
        Ok(())
    }

    /// Number of records in a bucket
    pub fn count(&self, bucket: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE bucket = ?1",
            [bucket],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Store a metadata value
    pub fn set_meta(&self, key: &str, value: &str) -> StoreResult<()> {
        schema::set_catalog_info(&self.conn, key, value)
    }

    /// Read a metadata value
    pub fn get_meta(&self, key: &str) -> StoreResult<Option<String>> {
        schema::get_catalog_info(&self.conn, key)
    }
}
