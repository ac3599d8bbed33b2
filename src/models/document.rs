//! Archived document model and its naming convention.
//!
//! A document binds a numeric identifier to an image artifact
//! (`document<id>image.<ext>`), an extracted-text artifact
//! (`document<id>text.txt`), and a metadata record.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::metadata::{Field, Metadata, MetadataEntry};
use crate::error::{ArchiveError, Result};
use crate::storage::{text_file_name, ArchiveLayout};

/// Which artifact a conforming file name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Text,
}

/// A validated artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentName {
    pub id: u64,
    pub kind: ArtifactKind,
    /// Extension of an image name, if it had one.
    pub extension: Option<String>,
}

fn artifact_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^document(\d+)(image|text)(?:\.([A-Za-z0-9]+))?$")
            .expect("artifact name pattern is valid")
    })
}

impl DocumentName {
    /// Parse `document<id>image[.<ext>]` or `document<id>text.txt`.
    pub fn parse(name: &str) -> Result<Self> {
        let mismatch = || {
            ArchiveError::ConventionMismatch(format!(
                "'{}' is not a document<id>image or document<id>text name",
                name
            ))
        };

        let caps = artifact_name_regex().captures(name).ok_or_else(mismatch)?;
        let id = caps[1].parse::<u64>().map_err(|_| mismatch())?;
        let extension = caps.get(3).map(|m| m.as_str().to_string());

        let kind = match &caps[2] {
            "image" => ArtifactKind::Image,
            _ if extension.as_deref() == Some("txt") => ArtifactKind::Text,
            _ => return Err(mismatch()),
        };

        Ok(Self {
            id,
            kind,
            extension,
        })
    }

    /// Parse a name that must refer to an image artifact.
    pub fn parse_image(name: &str) -> Result<Self> {
        let parsed = Self::parse(name)?;
        if parsed.kind != ArtifactKind::Image {
            return Err(ArchiveError::ConventionMismatch(format!(
                "'{}' names a text artifact, expected an image",
                name
            )));
        }
        Ok(parsed)
    }
}

/// An archived scan.
#[derive(Debug, Clone)]
pub struct Document {
    id: u64,
    image_file: String,
    image_path: PathBuf,
    text_file: String,
    text_path: PathBuf,
    text: String,
    /// Metadata record, recognized fields plus extensions.
    pub metadata: Metadata,
}

impl Document {
    /// Build a document from its canonical image file name.
    pub fn from_image_name(image_file: &str, layout: &ArchiveLayout) -> Result<Self> {
        let name = DocumentName::parse_image(image_file)?;
        let text_file = text_file_name(name.id);

        Ok(Self {
            id: name.id,
            image_path: layout.image_path(image_file),
            image_file: image_file.to_string(),
            text_path: layout.text_path(&text_file),
            text_file,
            text: String::new(),
            metadata: Metadata::new(),
        })
    }

    /// Build a document from a stored metadata record, loading its text.
    pub fn from_metadata(metadata: Metadata, layout: &ArchiveLayout) -> Result<Self> {
        let mut doc = Self::from_image_name(metadata.get(Field::FileName), layout)?;
        doc.metadata = metadata;
        doc.load_text()?;
        Ok(doc)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image_file(&self) -> &str {
        &self.image_file
    }

    pub fn image_path(&self) -> &PathBuf {
        &self.image_path
    }

    pub fn text_file(&self) -> &str {
        &self.text_file
    }

    pub fn text_path(&self) -> &PathBuf {
        &self.text_path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn has_image_file(&self) -> bool {
        self.image_path.exists()
    }

    pub fn has_text_file(&self) -> bool {
        self.text_path.exists()
    }

    /// A document is present in the archive only when its text artifact exists.
    pub fn has_files(&self) -> bool {
        self.has_text_file()
    }

    /// Read the text artifact into the cache; an absent artifact yields empty text.
    pub fn load_text(&mut self) -> Result<()> {
        self.text = if self.has_text_file() {
            fs::read_to_string(&self.text_path)?
        } else {
            String::new()
        };
        Ok(())
    }

    /// Write the cached text to the text artifact, replacing any content.
    pub fn write_text(&self) -> Result<()> {
        if let Some(parent) = self.text_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.text_path, &self.text)?;
        Ok(())
    }

    pub fn metadata_as_ordered_pairs(&self) -> Vec<(&str, &str)> {
        self.metadata.ordered_pairs()
    }

    pub fn title(&self) -> &str {
        self.metadata.get(Field::Title)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            image_file: self.image_file.clone(),
            text_file: self.text_file.clone(),
            metadata: self.metadata.to_entries(),
        }
    }
}

/// Serializable view of a document without its text.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: u64,
    pub image_file: String,
    pub text_file: String,
    pub metadata: Vec<MetadataEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_image_name() {
        let name = DocumentName::parse("document17image.jpg").unwrap();
        assert_eq!(name.id, 17);
        assert_eq!(name.kind, ArtifactKind::Image);
        assert_eq!(name.extension.as_deref(), Some("jpg"));
    }

    #[test]
    fn test_parse_text_name() {
        let name = DocumentName::parse("document3text.txt").unwrap();
        assert_eq!(name.id, 3);
        assert_eq!(name.kind, ArtifactKind::Text);
    }

    #[test]
    fn test_parse_rejects_nonconforming_names() {
        for bad in [
            "scan.jpg",
            "documentimage.jpg",
            "documentABCimage.jpg",
            "my_document1image.jpg",
            "document1text.md",
            "document1text",
            "",
        ] {
            assert!(
                matches!(
                    DocumentName::parse(bad),
                    Err(ArchiveError::ConventionMismatch(_))
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_image_rejects_text_name() {
        assert!(DocumentName::parse_image("document3text.txt").is_err());
    }

    #[test]
    fn test_document_derives_paths() {
        let layout = ArchiveLayout::under(std::path::Path::new("/a"));
        let doc = Document::from_image_name("document9image.png", &layout).unwrap();

        assert_eq!(doc.id(), 9);
        assert_eq!(doc.text_file(), "document9text.txt");
        assert_eq!(
            doc.image_path(),
            &PathBuf::from("/a/completed_files/document9image.png")
        );
        assert_eq!(
            doc.text_path(),
            &PathBuf::from("/a/completed_text_files/document9text.txt")
        );
    }

    #[test]
    fn test_load_text_absent_yields_empty() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::under(dir.path());
        let mut doc = Document::from_image_name("document1image.png", &layout).unwrap();

        doc.load_text().unwrap();
        assert_eq!(doc.text(), "");
        assert!(!doc.has_files());
    }

    #[test]
    fn test_write_then_load_text() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::under(dir.path());
        let mut doc = Document::from_image_name("document1image.png", &layout).unwrap();
        doc.set_text("Dear Sir,\nthe harvest was good.");
        doc.write_text().unwrap();

        let mut reloaded = Document::from_image_name("document1image.png", &layout).unwrap();
        reloaded.load_text().unwrap();
        assert_eq!(reloaded.text(), "Dear Sir,\nthe harvest was good.");
        assert!(reloaded.has_files());
    }

    #[test]
    fn test_from_metadata_requires_conforming_file_name() {
        let layout = ArchiveLayout::under(std::path::Path::new("/a"));
        let mut meta = Metadata::new();
        meta.set(Field::FileName, "IMG_0001.jpg");
        assert!(Document::from_metadata(meta, &layout).is_err());
    }
}
