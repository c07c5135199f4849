//! Content fingerprint calculation
//!
//! A fingerprint is a string summarizing file content, compared by exact
//! equality across catalogs. Two modes exist, fixed store-wide:
//!
//! - **Digest**: SHA-256 over the file bytes, lowercase hex. Deterministic
//!   for identical content regardless of path or mtime.
//! - **Size**: the decimal byte length. A cheap stand-in for trees where a
//!   full content pass is too expensive on every catalog run.
//!
//! Symlinks, directories, and entries that vanished between listing and
//! stat are classified out of catalog consideration rather than treated as
//! errors.

use crate::config::FingerprintMode;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for digest computation
const READ_BUF_SIZE: usize = 64 * 1024;

/// What a path turned out to be when examined on the live filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A regular file, eligible for cataloging
    File,
    /// A directory
    Directory,
    /// A symbolic link (never followed)
    Symlink,
    /// The path no longer exists
    Absent,
}

/// Classify a path without following symlinks
///
/// A vanished path is `Absent`, not an error; only genuine I/O failures
/// (permission denied, transient read errors) propagate.
pub fn classify(path: &Path) -> io::Result<PathKind> {
    match path.symlink_metadata() {
        Ok(meta) => {
            let ft = meta.file_type();
            if ft.is_symlink() {
                Ok(PathKind::Symlink)
            } else if ft.is_dir() {
                Ok(PathKind::Directory)
            } else {
                Ok(PathKind::File)
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PathKind::Absent),
        Err(e) => Err(e),
    }
}

/// Compute the fingerprint of a regular file in the given mode
pub fn compute(path: &Path, mode: FingerprintMode) -> io::Result<String> {
    match mode {
        FingerprintMode::Digest => digest(path),
        FingerprintMode::Size => size(path),
    }
}

/// SHA-256 digest of the file contents, lowercase hex
pub fn digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let hash = hasher.finalize();
    Ok(hex_encode(&hash))
}

/// File byte length as a decimal string
pub fn size(path: &Path) -> io::Result<String> {
    let meta = path.symlink_metadata()?;
    Ok(meta.len().to_string())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
