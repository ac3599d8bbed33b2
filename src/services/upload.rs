//! Photo-hosting upload collaborator.
//!
//! After a page is OCRed, the corrected image is handed to an uploader that
//! returns metadata fields (typically a hosted URL) to merge into the
//! document's record. The hosting protocol itself lives outside this crate:
//! `CommandUploader` runs a configured command whose arguments can include a
//! `{file}` placeholder and whose stdout is a JSON object of fields.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

use crate::config::UploadConfig;

/// Fields returned by an upload, keyed by metadata label.
pub type UploadFields = BTreeMap<String, String>;

/// Errors from the upload collaborator.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload command not found: {0}")]
    CommandNotFound(String),

    #[error("Upload command failed: {0}")]
    CommandFailed(String),

    #[error("Malformed upload response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uploads a corrected image and returns metadata fields to merge.
pub trait Uploader: Send + Sync {
    fn name(&self) -> &str;

    fn upload(&self, image_path: &Path) -> Result<UploadFields, UploadError>;
}

/// Used when no uploader is configured. Returns no fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpload;

impl Uploader for NoUpload {
    fn name(&self) -> &str {
        "none"
    }

    fn upload(&self, _image_path: &Path) -> Result<UploadFields, UploadError> {
        Ok(UploadFields::new())
    }
}

/// Runs an external command per image.
#[derive(Debug, Clone)]
pub struct CommandUploader {
    command: String,
    args: Vec<String>,
}

impl CommandUploader {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    /// Expand `{file}` in each argument. Without any placeholder the path is
    /// passed as the last argument.
    fn build_args(&self, image_path: &Path) -> Vec<String> {
        let file_str = image_path.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{file}", &file_str))
            .collect();

        if !self.args.iter().any(|arg| arg.contains("{file}")) {
            args.push(file_str.into_owned());
        }
        args
    }
}

impl Uploader for CommandUploader {
    fn name(&self) -> &str {
        &self.command
    }

    fn upload(&self, image_path: &Path) -> Result<UploadFields, UploadError> {
        let args = self.build_args(image_path);
        tracing::debug!("running upload: {} {:?}", self.command, args);

        let output = match Command::new(&self.command).args(&args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::CommandNotFound(self.command.clone()))
            }
            Err(e) => return Err(UploadError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UploadError::CommandFailed(format!(
                "{} failed (exit code {:?}): {}",
                self.command,
                output.status.code(),
                stderr.lines().take(5).collect::<Vec<_>>().join("\n")
            )));
        }

        parse_fields(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse uploader stdout: empty output means no fields, otherwise a JSON
/// object whose values are strings, numbers, booleans or null.
pub fn parse_fields(stdout: &str) -> Result<UploadFields, UploadError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(UploadFields::new());
    }

    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(trimmed)
        .map_err(|e| UploadError::MalformedResponse(format!("expected a JSON object: {}", e)))?;

    let mut fields = UploadFields::new();
    for (key, value) in object {
        let value = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(UploadError::MalformedResponse(format!(
                    "field '{}' is not a scalar: {}",
                    key, other
                )))
            }
        };
        fields.insert(key, value);
    }
    Ok(fields)
}
