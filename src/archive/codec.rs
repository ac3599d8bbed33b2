//! Bracket-delimited metadata block format.
//!
//! A block is one `Name: [value]` line per field: the recognized fields in
//! schema order (empty values included), then extension fields sorted by
//! name. There is no escaping, so values containing `]` or line breaks are
//! rejected at encode time rather than written in a form that would not read
//! back.

use crate::error::{ArchiveError, Result};
use crate::models::{Field, Metadata};

/// Encodes and decodes metadata records.
pub trait MetadataCodec {
    fn encode(&self, metadata: &Metadata) -> Result<String>;
    fn decode(&self, block: &str) -> Result<Metadata>;
}

/// The legacy `Name: [value]` line format.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketCodec;

impl MetadataCodec for BracketCodec {
    fn encode(&self, metadata: &Metadata) -> Result<String> {
        encode(metadata)
    }

    fn decode(&self, block: &str) -> Result<Metadata> {
        decode(block)
    }
}

/// Serialize a record as a block (no trailing newline).
pub fn encode(metadata: &Metadata) -> Result<String> {
    let mut lines = Vec::with_capacity(Field::COUNT + metadata.extensions().len());
    for (label, value) in metadata.ordered_pairs() {
        validate_label(label)?;
        validate_value(label, value)?;
        lines.push(format!("{}: [{}]", label, value));
    }
    Ok(lines.join("\n"))
}

/// Parse a block. Blank lines are ignored; any other line without a colon is
/// an error.
pub fn decode(block: &str) -> Result<Metadata> {
    let mut metadata = Metadata::new();

    for (number, line) in block.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (label, value) = line.split_once(':').ok_or_else(|| {
            ArchiveError::ConventionMismatch(format!(
                "metadata line {} has no ':' separator: {:?}",
                number + 1,
                line
            ))
        })?;

        metadata.insert(label.trim(), strip_brackets(value.trim()));
    }

    Ok(metadata)
}

/// A record with every recognized field empty except the file name.
pub fn blank_template(document_name: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.set(Field::FileName, document_name);
    metadata
}

fn strip_brackets(value: &str) -> &str {
    let value = value.strip_prefix('[').unwrap_or(value);
    value.strip_suffix(']').unwrap_or(value)
}

fn validate_label(label: &str) -> Result<()> {
    let reason = if label.trim().is_empty() {
        Some("field name is empty")
    } else if label.contains(':') {
        Some("field name contains ':'")
    } else if label.contains(['\n', '\r']) {
        Some("field name contains a line break")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ArchiveError::InvalidValue {
            field: label.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn validate_value(label: &str, value: &str) -> Result<()> {
    let reason = if value.contains(']') {
        Some("value contains ']'")
    } else if value.contains(['\n', '\r']) {
        Some("value contains a line break")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ArchiveError::InvalidValue {
            field: label.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
