//! Typed metadata record: the fixed recognized fields plus sorted extensions.

use std::collections::BTreeMap;

use serde::Serialize;

/// A recognized metadata field. Declaration order is schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    FileName,
    PictureTaker,
    DateAdded,
    BoxNumber,
    Folder,
    PageNumber,
    Title,
    Creator,
    Subject,
    Description,
    Publisher,
    Type,
    Format,
    Source,
    Language,
    Tags,
    Rights,
    Comments,
}

impl Field {
    /// Number of recognized fields.
    pub const COUNT: usize = 18;

    /// All recognized fields in schema order.
    pub const ALL: [Field; Field::COUNT] = [
        Field::FileName,
        Field::PictureTaker,
        Field::DateAdded,
        Field::BoxNumber,
        Field::Folder,
        Field::PageNumber,
        Field::Title,
        Field::Creator,
        Field::Subject,
        Field::Description,
        Field::Publisher,
        Field::Type,
        Field::Format,
        Field::Source,
        Field::Language,
        Field::Tags,
        Field::Rights,
        Field::Comments,
    ];

    /// Label used in the archive file.
    pub fn label(&self) -> &'static str {
        match self {
            Field::FileName => "File Name",
            Field::PictureTaker => "Name of Picture Taker (Last, First)",
            Field::DateAdded => "Date Added (mm/dd/yyyy)",
            Field::BoxNumber => "Box Number",
            Field::Folder => "Folder",
            Field::PageNumber => "Page Number",
            Field::Title => "Title",
            Field::Creator => "Creator",
            Field::Subject => "Subject",
            Field::Description => "Description",
            Field::Publisher => "Publisher",
            Field::Type => "Type",
            Field::Format => "Format",
            Field::Source => "Source",
            Field::Language => "Language",
            Field::Tags => "Tags and/or Keywords",
            Field::Rights => "Rights Management",
            Field::Comments => "Comments/Notes about File",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Field::ALL.iter().copied().find(|f| f.label() == label)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A document's metadata.
///
/// Every recognized field is always present (possibly empty). Fields outside
/// the recognized set live in `extensions`, kept in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    recognized: [String; Field::COUNT],
    extensions: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &str {
        &self.recognized[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.recognized[field.index()] = value.into();
    }

    /// Look up a value by label, recognized or extension.
    pub fn get_by_label(&self, label: &str) -> Option<&str> {
        match Field::from_label(label) {
            Some(field) => Some(self.get(field)),
            None => self.extensions.get(label).map(String::as_str),
        }
    }

    /// Insert a value by label, routing to the recognized slot when the label
    /// names one.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        match Field::from_label(&label) {
            Some(field) => self.set(field, value),
            None => {
                self.extensions.insert(label, value.into());
            }
        }
    }

    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }

    /// Overlay label/value pairs onto this record.
    pub fn merge<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (label, value) in fields {
            self.insert(label, value);
        }
    }

    /// True when every value, recognized or extension, is empty.
    pub fn is_blank(&self) -> bool {
        self.recognized.iter().all(String::is_empty)
            && self.extensions.values().all(String::is_empty)
    }

    /// Recognized fields in schema order, then extensions sorted by label.
    pub fn ordered_pairs(&self) -> Vec<(&str, &str)> {
        Field::ALL
            .iter()
            .map(|f| (f.label(), self.get(*f)))
            .chain(
                self.extensions
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            )
            .collect()
    }

    /// The record as an ordered list of owned label/value pairs.
    pub fn to_entries(&self) -> Vec<MetadataEntry> {
        self.ordered_pairs()
            .into_iter()
            .map(|(label, value)| MetadataEntry {
                label: label.to_string(),
                value: value.to_string(),
            })
            .collect()
    }
}

/// One label/value pair, for serialized output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    pub label: String,
    pub value: String,
}
