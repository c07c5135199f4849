//! The repair queue: a persistent, resumable work queue of transfer tasks
//!
//! A task's presence in the queue means "not yet confirmed executed". The
//! queue is populated in batches from a diff report on a fresh run, and
//! drained in batches by the repair executor; each drained batch is deleted
//! in one transaction only after every command in it has returned. A crash
//! before that deletion commits leaves the batch pending, so a resumed run
//! re-executes it (at-least-once).

use crate::error::{StoreError, StoreResult};
use crate::store::schema;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// One unit of repair work: re-transfer a single file from its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairTask {
    /// Bucket the file belongs to
    pub bucket: String,

    /// Path relative to the bucket root
    pub path: String,

    /// Absolute path of the source file on local disk
    pub abs_path: String,
}

/// A handle on one repair queue file
pub struct RepairQueue {
    conn: Connection,
    path: PathBuf,
}

impl RepairQueue {
    /// Open (creating if absent) a repair queue
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        schema::create_queue(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// The underlying queue file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a batch of tasks in one durable transaction
    pub fn insert_batch(&self, tasks: &[RepairTask]) -> StoreResult<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO tasks (bucket, path, abs_path) VALUES (?1, ?2, ?3)",
            )?;
            for task in tasks {
                stmt.execute(params![task.bucket, task.path, task.abs_path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Read up to `limit` pending tasks in bucket-then-path order
    ///
    /// Tasks are not removed by reading; retirement happens separately via
    /// [`delete_batch`](Self::delete_batch) once a batch has been executed.
    pub fn read_batch(&self, limit: usize) -> StoreResult<Vec<RepairTask>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT bucket, path, abs_path FROM tasks ORDER BY bucket, path LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(RepairTask {
                bucket: row.get(0)?,
                path: row.get(1)?,
                abs_path: row.get(2)?,
            })
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Retire a batch of tasks in one transaction
    pub fn delete_batch(&self, tasks: &[RepairTask]) -> StoreResult<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx
                .prepare_cached("DELETE FROM tasks WHERE bucket = ?1 AND path = ?2")?;
            for task in tasks {
                stmt.execute(params![task.bucket, task.path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of pending tasks
    pub fn len(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Whether the queue has no pending tasks
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
