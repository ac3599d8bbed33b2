//! Sequential document identifier allocation.
//!
//! The counter file holds the next identifier to hand out as a single
//! non-negative integer. Each allocation reads it, returns the value, and
//! rewrites `value + 1` under an exclusive lock, replacing the file
//! atomically so a crash never leaves a truncated counter behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::lock::FileLock;
use crate::error::{ArchiveError, Result};

/// Hands out strictly increasing identifiers from a persisted counter.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    path: PathBuf,
}

impl IdAllocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the counter file at `start` unless one already exists.
    ///
    /// Returns true if a new counter was written.
    pub fn init(path: impl Into<PathBuf>, start: u64) -> Result<(Self, bool)> {
        let allocator = Self::new(path);
        let _lock = FileLock::exclusive(&allocator.path)?;
        if allocator.path.exists() {
            return Ok((allocator, false));
        }
        allocator.write_counter(start)?;
        Ok((allocator, true))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The identifier the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> Result<u64> {
        let _lock = FileLock::shared(&self.path)?;
        self.read_counter()
    }

    /// Reserve the next identifier. Reserved identifiers are never reused.
    pub fn next_id(&self) -> Result<u64> {
        let _lock = FileLock::exclusive(&self.path)?;
        let id = self.read_counter()?;
        let next = id.checked_add(1).ok_or_else(|| {
            ArchiveError::Configuration(format!(
                "identifier counter in {} is exhausted",
                self.path.display()
            ))
        })?;
        self.write_counter(next)?;
        tracing::debug!("allocated document id {}", id);
        Ok(id)
    }

    fn read_counter(&self) -> Result<u64> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            ArchiveError::Configuration(format!(
                "cannot read identifier counter {}: {}",
                self.path.display(),
                e
            ))
        })?;

        contents.trim().parse::<u64>().map_err(|_| {
            ArchiveError::Configuration(format!(
                "identifier counter {} is not a non-negative integer: {:?}",
                self.path.display(),
                contents.trim()
            ))
        })
    }

    fn write_counter(&self, value: u64) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        write!(tmp, "{}", value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
