//! Diff report file format
//!
//! One record per line, `bucket,relative_path,status`, append-only. The
//! status field is `missing` or `checksum wrong`. Fields are not escaped:
//! a path containing a comma corrupts its own line (known limitation of
//! the format).
//!
//! The writer is a scoped resource: it is constructed for one diff run and
//! flushed on every exit path, including drop. The reader tolerates
//! malformed lines, logging and skipping them rather than failing the run.

use crate::error::{ReportError, ReportResult};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Classification of one diff report entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    /// Present in the source catalog, absent in the target
    Missing,
    /// Present in both catalogs with different fingerprints
    Mismatch,
}

impl DiffStatus {
    /// The on-disk status field
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStatus::Missing => "missing",
            DiffStatus::Mismatch => "checksum wrong",
        }
    }

    /// Parse the on-disk status field
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "missing" => Some(DiffStatus::Missing),
            "checksum wrong" => Some(DiffStatus::Mismatch),
            _ => None,
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed line of a diff report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Bucket the file belongs to
    pub bucket: String,

    /// Path relative to the bucket root
    pub path: String,

    /// Missing or mismatched
    pub status: DiffStatus,
}

/// Append-only writer for one diff run
pub struct ReportWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    entries_written: u64,
}

impl ReportWriter {
    /// Create (truncating) the report file
    pub fn create(path: &Path) -> ReportResult<Self> {
        let file = File::create(path).map_err(|e| ReportError::CreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            entries_written: 0,
        })
    }

    /// Append one entry, flushing it to disk immediately
    pub fn append(&mut self, bucket: &str, path: &str, status: DiffStatus) -> ReportResult<()> {
        writeln!(self.writer, "{},{},{}", bucket, path, status.as_str())?;
        self.writer.flush()?;
        self.entries_written += 1;
        Ok(())
    }

    /// Entries appended so far
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// The report file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close, returning the number of entries written
    pub fn finish(mut self) -> ReportResult<u64> {
        self.writer.flush()?;
        Ok(self.entries_written)
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Tolerant line-by-line reader of a diff report
pub struct ReportReader {
    reader: BufReader<File>,
    path: PathBuf,
}

impl ReportReader {
    /// Open an existing report file
    pub fn open(path: &Path) -> ReportResult<Self> {
        let file = File::open(path).map_err(|e| ReportError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Stream every well-formed entry through the callback
    ///
    /// Malformed lines (wrong field count, unknown status, empty bucket or
    /// path) are logged and skipped. Only I/O failures propagate. Generic
    /// over the caller's error type so that callbacks can touch stores and
    /// queues as they go.
    pub fn for_each<E: From<std::io::Error>>(
        mut self,
        mut f: impl FnMut(DiffEntry) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        let mut line = String::new();
        let mut line_no = 0u64;

        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;

            let text = line.trim_end_matches(['\n', '\r']);
            if text.is_empty() {
                continue;
            }

            match parse_line(text) {
                Some(entry) => f(entry)?,
                None => {
                    warn!(report = %self.path.display(), line = line_no, "Malformed report line, skipping");
                }
            }
        }
        Ok(())
    }
}

/// Parse one `bucket,path,status` line
fn parse_line(text: &str) -> Option<DiffEntry> {
    let mut fields = text.splitn(3, ',');
    let bucket = fields.next()?;
    let path = fields.next()?;
    let status = DiffStatus::parse(fields.next()?)?;

    if bucket.is_empty() || path.is_empty() {
        return None;
    }

    Some(DiffEntry {
        bucket: bucket.to_string(),
        path: path.to_string(),
        status,
    })
}
