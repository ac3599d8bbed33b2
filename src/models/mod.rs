//! Data models for the archive.

mod document;
mod metadata;

pub use document::{ArtifactKind, Document, DocumentName, DocumentSummary};
pub use metadata::{Field, Metadata, MetadataEntry};
