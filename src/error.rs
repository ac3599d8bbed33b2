//! Error types for the archive engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::ocr::OcrError;
use crate::services::UploadError;

/// Errors raised by the archive engine.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Missing or corrupt counter/archive file, or an unusable setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A file name or metadata line does not follow the archive conventions.
    #[error("Naming convention mismatch: {0}")]
    ConventionMismatch(String),

    /// The OCR engine or the upload collaborator failed.
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// A required artifact is absent.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A metadata value cannot be represented in the bracket format.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OcrError> for ArchiveError {
    fn from(e: OcrError) -> Self {
        ArchiveError::Collaborator {
            collaborator: "ocr",
            message: e.to_string(),
        }
    }
}

impl From<UploadError> for ArchiveError {
    fn from(e: UploadError) -> Self {
        ArchiveError::Collaborator {
            collaborator: "upload",
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
