//! The append-only flat metadata file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::codec::{decode, encode};
use super::lock::FileLock;
use crate::error::{ArchiveError, Result};
use crate::models::{Document, Field, Metadata};
use crate::storage::ArchiveLayout;

/// The archive's system of record: one metadata block per document,
/// blocks separated by a blank line, in append order.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create an empty archive file unless one exists. Returns true if created.
    pub fn init(path: impl Into<PathBuf>) -> Result<(Self, bool)> {
        let store = Self::new(path);
        let _lock = FileLock::exclusive(&store.path)?;
        if store.path.exists() {
            return Ok((store, false));
        }
        fs::write(&store.path, "")?;
        Ok((store, true))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<String> {
        let _lock = FileLock::shared(&self.path)?;
        self.read_unlocked()
    }

    /// Read the file; the caller holds a lock.
    fn read_unlocked(&self) -> Result<String> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            ArchiveError::Configuration(format!(
                "cannot read archive file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(raw.replace("\r\n", "\n"))
    }

    /// Decode every block in append order. Blocks that fail to decode are
    /// dropped with a warning.
    pub fn load_all(&self) -> Result<Vec<Metadata>> {
        let raw = self.read_raw()?;
        Ok(self.decode_blocks(&raw))
    }

    fn decode_blocks(&self, raw: &str) -> Vec<Metadata> {
        let mut records = Vec::new();

        for (index, section) in raw.split("\n\n").enumerate() {
            if section.trim().is_empty() {
                continue;
            }
            match decode(section) {
                Ok(metadata) => records.push(metadata),
                Err(e) => tracing::warn!(
                    "dropping archive block {} in {}: {}",
                    index + 1,
                    self.path.display(),
                    e
                ),
            }
        }

        records
    }

    /// Append one encoded block. The block is validated before anything is
    /// written and lands in a single write under the exclusive lock.
    pub fn append(&self, metadata: &Metadata) -> Result<()> {
        self.write_block(metadata, false).map(|_| ())
    }

    /// Append a block unless one with the same file name is already stored.
    /// The check and the write share one exclusive lock. Returns true if the
    /// block was written.
    pub fn append_if_absent(&self, metadata: &Metadata) -> Result<bool> {
        self.write_block(metadata, true)
    }

    fn write_block(&self, metadata: &Metadata, skip_existing: bool) -> Result<bool> {
        let block = encode(metadata)?;
        let file_name = metadata.get(Field::FileName);

        let _lock = FileLock::exclusive(&self.path)?;
        if !self.path.exists() {
            return Err(ArchiveError::Configuration(format!(
                "archive file {} does not exist (run `scanarchive init`)",
                self.path.display()
            )));
        }

        let raw = self.read_unlocked()?;
        if skip_existing
            && self
                .decode_blocks(&raw)
                .iter()
                .any(|m| m.get(Field::FileName) == file_name)
        {
            tracing::debug!("{} already recorded in {}", file_name, self.path.display());
            return Ok(false);
        }

        // Files written by other tools may lack the trailing blank line.
        let mut out = String::from(block_separator(&raw));
        out.push_str(&block);
        out.push_str("\n\n");

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(out.as_bytes())?;
        file.sync_data()?;

        tracing::debug!("appended block for {} to {}", file_name, self.path.display());
        Ok(true)
    }

    /// Whether a block for this canonical file name is already stored.
    pub fn contains(&self, file_name: &str) -> Result<bool> {
        Ok(self
            .load_all()?
            .iter()
            .any(|m| m.get(Field::FileName) == file_name))
    }

    /// Every present document: blocks whose file name follows the naming
    /// convention and whose text artifact exists and is readable, in append
    /// order.
    pub fn read_documents(&self, layout: &ArchiveLayout) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        for metadata in self.load_all()? {
            let file_name = metadata.get(Field::FileName).to_string();
            match Document::from_metadata(metadata, layout) {
                Ok(doc) if doc.has_files() => documents.push(doc),
                Ok(_) => tracing::debug!("skipping {}: text artifact missing", file_name),
                Err(e) => tracing::warn!("skipping archive record '{}': {}", file_name, e),
            }
        }

        Ok(documents)
    }

    /// Find a present document by identifier.
    pub fn find_document(&self, layout: &ArchiveLayout, id: u64) -> Result<Option<Document>> {
        Ok(self
            .read_documents(layout)?
            .into_iter()
            .find(|doc| doc.id() == id))
    }
}

/// What must precede a new block so it starts after a blank line.
fn block_separator(raw: &str) -> &'static str {
    if raw.trim().is_empty() || raw.ends_with("\n\n") {
        ""
    } else if raw.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    }
}
