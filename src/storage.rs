//! Storage helpers for archive artifacts on disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{ArchiveError, Result};

/// Where the archive keeps its artifacts and flat files.
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    /// Directory holding `document<id>image.<ext>` files.
    pub images_dir: PathBuf,
    /// Directory holding `document<id>text.txt` files.
    pub texts_dir: PathBuf,
    /// The flat metadata file (system of record).
    pub archive_path: PathBuf,
    /// The identifier counter file.
    pub counter_path: PathBuf,
}

impl ArchiveLayout {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            images_dir: settings.images_dir.clone(),
            texts_dir: settings.texts_dir.clone(),
            archive_path: settings.archive_path(),
            counter_path: settings.counter_path(),
        }
    }

    /// Lay everything out under a single root directory.
    pub fn under(root: &Path) -> Self {
        Self {
            images_dir: root.join(crate::config::IMAGES_SUBDIR),
            texts_dir: root.join(crate::config::TEXTS_SUBDIR),
            archive_path: root.join(crate::config::DEFAULT_ARCHIVE_FILENAME),
            counter_path: root.join(crate::config::DEFAULT_COUNTER_FILENAME),
        }
    }

    pub fn image_path(&self, image_file: &str) -> PathBuf {
        self.images_dir.join(image_file)
    }

    pub fn text_path(&self, text_file: &str) -> PathBuf {
        self.texts_dir.join(text_file)
    }

    /// Ensure the artifact directories and the flat files' parents exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        let flat_parents = [self.archive_path.parent(), self.counter_path.parent()];
        let dirs = [Some(self.images_dir.as_path()), Some(self.texts_dir.as_path())]
            .into_iter()
            .chain(flat_parents)
            .flatten()
            .filter(|p| !p.as_os_str().is_empty());

        for dir in dirs {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                )
            })?;
        }
        Ok(())
    }
}

/// Canonical image file name: `document<id>image.<ext>`.
pub fn image_file_name(id: u64, extension: &str) -> String {
    format!("document{}image.{}", id, extension)
}

/// Canonical text file name: `document<id>text.txt`.
pub fn text_file_name(id: u64) -> String {
    format!("document{}text.txt", id)
}

/// Outcome of moving a staged file into the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Moved,
    /// The source was already gone and the destination present.
    AlreadyInPlace,
}

/// Move `src` to `dst`, falling back to copy+remove across filesystems.
///
/// Never overwrites an existing destination while the source still exists.
pub fn relocate(src: &Path, dst: &Path) -> Result<Relocation> {
    let src_exists = src.exists();
    let dst_exists = dst.exists();

    match (src_exists, dst_exists) {
        (false, true) => {
            tracing::debug!("{} already relocated", dst.display());
            return Ok(Relocation::AlreadyInPlace);
        }
        (false, false) => return Err(ArchiveError::NotFound(src.to_path_buf())),
        (true, true) => {
            return Err(ArchiveError::ConventionMismatch(format!(
                "refusing to overwrite existing artifact {}",
                dst.display()
            )))
        }
        (true, false) => {}
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Err(e) = fs::rename(src, dst) {
        tracing::debug!(
            "rename {} -> {} failed ({}), copying instead",
            src.display(),
            dst.display(),
            e
        );
        fs::copy(src, dst)?;
        fs::remove_file(src)?;
    }

    Ok(Relocation::Moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_canonical_names() {
        assert_eq!(image_file_name(42, "jpg"), "document42image.jpg");
        assert_eq!(text_file_name(42), "document42text.txt");
    }

    #[test]
    fn test_layout_under_root() {
        let layout = ArchiveLayout::under(Path::new("/srv/archive"));
        assert_eq!(
            layout.image_path("document1image.png"),
            PathBuf::from("/srv/archive/completed_files/document1image.png")
        );
        assert_eq!(
            layout.text_path("document1text.txt"),
            PathBuf::from("/srv/archive/completed_text_files/document1text.txt")
        );
        assert_eq!(layout.archive_path, PathBuf::from("/srv/archive/metadata.txt"));
    }

    #[test]
    fn test_relocate_moves_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("scan.png");
        let dst = dir.path().join("out").join("document1image.png");
        fs::write(&src, b"pixels").unwrap();

        assert_eq!(relocate(&src, &dst).unwrap(), Relocation::Moved);
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"pixels");
    }

    #[test]
    fn test_relocate_is_idempotent_on_retry() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("scan.png");
        let dst = dir.path().join("document1image.png");
        fs::write(&dst, b"pixels").unwrap();

        assert_eq!(relocate(&src, &dst).unwrap(), Relocation::AlreadyInPlace);
    }

    #[test]
    fn test_relocate_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("scan.png");
        let dst = dir.path().join("document1image.png");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();

        let err = relocate(&src, &dst).unwrap_err();
        assert!(matches!(err, ArchiveError::ConventionMismatch(_)));
        assert_eq!(fs::read(&dst).unwrap(), b"old");
    }

    #[test]
    fn test_relocate_missing_source() {
        let dir = tempdir().unwrap();
        let err = relocate(&dir.path().join("a"), &dir.path().join("b")).unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }
}
