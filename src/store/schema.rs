//! Store schema definitions and creation
//!
//! Both persistent stores (the catalog and the repair queue) are SQLite
//! files. Each store maps a `(bucket, path)` key to one value string: the
//! fingerprint for catalogs, the absolute source path for the repair queue.
//! The composite primary key gives bucket-then-path iteration order for free.

use crate::error::StoreResult;
use rusqlite::Connection;

/// Current schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQL to create the catalog record table
const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    bucket TEXT NOT NULL,
    path TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    PRIMARY KEY (bucket, path)
) WITHOUT ROWID
"#;

/// SQL to create the bucket registry table
const CREATE_BUCKETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS buckets (
    name TEXT PRIMARY KEY
) WITHOUT ROWID
"#;

/// SQL to create the catalog metadata table
const CREATE_CATALOG_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// SQL to create the repair task table
const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    bucket TEXT NOT NULL,
    path TEXT NOT NULL,
    abs_path TEXT NOT NULL,
    PRIMARY KEY (bucket, path)
) WITHOUT ROWID
"#;

/// SQLite pragmas applied to every store connection
///
/// WAL keeps reads open while the writer thread commits batches, and
/// synchronous=NORMAL keeps committed transactions durable across a crash
/// without paying a full fsync per commit.
const STORE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
PRAGMA temp_store = MEMORY;
PRAGMA cache_size = -64000;
"#;

/// Create and configure a catalog store database
pub fn create_catalog(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(STORE_PRAGMAS)?;
    conn.execute(CREATE_RECORDS_TABLE, [])?;
    conn.execute(CREATE_BUCKETS_TABLE, [])?;
    conn.execute(CREATE_CATALOG_INFO_TABLE, [])?;
    Ok(())
}

/// Create and configure a repair queue database
pub fn create_queue(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(STORE_PRAGMAS)?;
    conn.execute(CREATE_TASKS_TABLE, [])?;
    Ok(())
}

/// Store catalog metadata
pub fn set_catalog_info(conn: &Connection, key: &str, value: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO catalog_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get catalog metadata
pub fn get_catalog_info(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM catalog_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata keys used by the catalog store
pub mod keys {
    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Fingerprint mode: "digest" or "size"
    pub const FINGERPRINT_MODE: &str = "fingerprint_mode";

    /// Version of the tool that created the store
    pub const TOOL_VERSION: &str = "tool_version";

    /// Timestamp when the last scan started (RFC 3339)
    pub const LAST_SCAN_START: &str = "last_scan_start";

    /// Timestamp when the last scan completed (RFC 3339)
    pub const LAST_SCAN_END: &str = "last_scan_end";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_catalog() {
        let conn = Connection::open_in_memory().unwrap();
        create_catalog(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('records', 'buckets', 'catalog_info')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_create_queue() {
        let conn = Connection::open_in_memory().unwrap();
        create_queue(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='tasks'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_catalog_info() {
        let conn = Connection::open_in_memory().unwrap();
        create_catalog(&conn).unwrap();

        set_catalog_info(&conn, keys::FINGERPRINT_MODE, "digest").unwrap();
        let value = get_catalog_info(&conn, keys::FINGERPRINT_MODE).unwrap();
        assert_eq!(value, Some("digest".to_string()));

        let missing = get_catalog_info(&conn, "nonexistent").unwrap();
        assert_eq!(missing, None);
    }
}
