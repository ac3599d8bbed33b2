//! Staging area scanning.
//!
//! The staging directory holds one subdirectory per batch. Each batch carries
//! a seed metadata file (`*.txt`) shared by every image in it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};
use crate::utils::detect_image_type;

/// A staged image awaiting ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    pub path: PathBuf,
    /// Extension for the canonical archive name.
    pub extension: String,
}

/// One batch folder in the staging area.
#[derive(Debug, Clone)]
pub struct StagedBatch {
    pub dir: PathBuf,
    pub seed_file: Option<PathBuf>,
    pub images: Vec<StagedImage>,
}

impl StagedBatch {
    /// Scan a batch folder for its seed file and images.
    pub fn scan(dir: &Path) -> Result<Self> {
        let entries = sorted_files(dir)?;

        let seed_file = entries.iter().find(|p| is_seed_file(p)).cloned();
        let images = entries
            .iter()
            .filter(|p| !is_seed_file(p))
            .filter_map(|p| staged_image(p))
            .collect();

        Ok(Self {
            dir: dir.to_path_buf(),
            seed_file,
            images,
        })
    }

    pub fn name(&self) -> String {
        Self::name_of(&self.dir)
    }

    /// Display name of a batch folder.
    pub fn name_of(dir: &Path) -> String {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    }
}

/// Batch directories under `staging_dir`, in name order.
pub fn list_batches(staging_dir: &Path) -> Result<Vec<PathBuf>> {
    if !staging_dir.is_dir() {
        return Err(ArchiveError::NotFound(staging_dir.to_path_buf()));
    }

    let mut batches = Vec::new();
    for entry in fs::read_dir(staging_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            batches.push(path);
        }
    }
    batches.sort();
    Ok(batches)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_seed_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

fn staged_image(path: &Path) -> Option<StagedImage> {
    let detected = detect_image_type(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(detected.extension)
        .to_string();

    Some(StagedImage {
        path: path.to_path_buf(),
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use tempfile::tempdir;

    fn png(path: &Path) {
        RgbImage::new(2, 2)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_list_batches_in_name_order() {
        let dir = tempdir().unwrap();
        for name in ["b_box2", "a_box1", "c_box3"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("stray.txt"), "").unwrap();

        let names: Vec<String> = list_batches(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_box1", "b_box2", "c_box3"]);
    }

    #[test]
    fn test_missing_staging_dir() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            list_batches(&dir.path().join("loading_zone")),
            Err(ArchiveError::NotFound(_))
        ));
    }

    #[test]
    fn test_scan_batch() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b_seed.txt"), "Title: [second]").unwrap();
        fs::write(dir.path().join("a_seed.TXT"), "Title: [first]").unwrap();
        fs::write(dir.path().join("notes.md"), "not an image").unwrap();
        png(&dir.path().join("page2.png"));
        png(&dir.path().join("page1"));

        let batch = StagedBatch::scan(dir.path()).unwrap();
        assert_eq!(batch.seed_file, Some(dir.path().join("a_seed.TXT")));
        assert_eq!(
            batch.images,
            vec![
                StagedImage {
                    path: dir.path().join("page1"),
                    extension: "png".to_string(),
                },
                StagedImage {
                    path: dir.path().join("page2.png"),
                    extension: "png".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_scan_keeps_source_extension() {
        let dir = tempdir().unwrap();
        png(&dir.path().join("scan.JPG"));

        let batch = StagedBatch::scan(dir.path()).unwrap();
        assert!(batch.seed_file.is_none());
        assert_eq!(batch.images[0].extension, "JPG");
    }
}
