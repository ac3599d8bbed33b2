//! Case-insensitive substring search over metadata and extracted text.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::archive::ArchiveStore;
use crate::error::Result;
use crate::models::{Document, DocumentSummary};
use crate::storage::ArchiveLayout;

/// A document matching a search term.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document: Document,
    /// Labels of metadata fields whose value contains the term.
    pub meta_matches: Vec<String>,
    /// Character offsets of each non-overlapping occurrence in the text.
    pub text_matches: Vec<usize>,
}

/// Serialized form of a hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHitSummary {
    #[serde(flatten)]
    pub document: DocumentSummary,
    pub meta_matches: Vec<String>,
    pub text_matches: Vec<usize>,
}

impl SearchHit {
    pub fn summary(&self) -> SearchHitSummary {
        SearchHitSummary {
            document: self.document.summary(),
            meta_matches: self.meta_matches.clone(),
            text_matches: self.text_matches.clone(),
        }
    }
}

/// Character offsets of non-overlapping occurrences of `needle` in
/// `haystack`, scanning left to right and resuming past each match.
/// Both arguments are compared as given; callers lowercase them.
pub fn find_offsets(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }

    let mut offsets = Vec::new();
    let mut chars_before = 0;
    let mut byte_pos = 0;

    for (byte_idx, _) in haystack.match_indices(needle) {
        chars_before += haystack[byte_pos..byte_idx].chars().count();
        offsets.push(chars_before);
        chars_before += needle.chars().count();
        byte_pos = byte_idx + needle.len();
    }
    offsets
}

/// Match one document against an already-lowercased term.
fn match_document(document: &Document, term: &str) -> Option<SearchHit> {
    let meta_matches: Vec<String> = document
        .metadata_as_ordered_pairs()
        .into_iter()
        .filter(|(_, value)| value.to_lowercase().contains(term))
        .map(|(label, _)| label.to_string())
        .collect();

    let text_matches = find_offsets(&document.text().to_lowercase(), term);

    if meta_matches.is_empty() && text_matches.is_empty() {
        return None;
    }

    Some(SearchHit {
        document: document.clone(),
        meta_matches,
        text_matches,
    })
}

/// Search documents for `term`. Each document appears at most once (the
/// first with a given identifier wins), ordered by ascending identifier.
/// An empty term matches nothing.
pub fn search_documents(documents: &[Document], term: &str) -> Vec<SearchHit> {
    let term = term.to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }

    let mut hits: BTreeMap<u64, SearchHit> = BTreeMap::new();
    for document in documents {
        if hits.contains_key(&document.id()) {
            continue;
        }
        if let Some(hit) = match_document(document, &term) {
            hits.insert(document.id(), hit);
        }
    }

    tracing::debug!("search for {:?}: {} hits", term, hits.len());
    hits.into_values().collect()
}

/// Searches the present documents of an archive.
pub struct SearchEngine<'a> {
    store: &'a ArchiveStore,
    layout: &'a ArchiveLayout,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a ArchiveStore, layout: &'a ArchiveLayout) -> Self {
        Self { store, layout }
    }

    /// Reload the archive and search it.
    pub fn search(&self, term: &str) -> Result<Vec<SearchHit>> {
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let documents = self.store.read_documents(self.layout)?;
        Ok(search_documents(&documents, term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;
    use std::path::Path;

    fn doc(layout: &ArchiveLayout, id: u64, title: &str, text: &str) -> Document {
        let name = crate::storage::image_file_name(id, "jpg");
        let mut doc = Document::from_image_name(&name, layout).unwrap();
        doc.metadata.set(Field::FileName, name);
        doc.metadata.set(Field::Title, title);
        doc.set_text(text);
        doc
    }

    fn layout() -> ArchiveLayout {
        ArchiveLayout::under(Path::new("/archive"))
    }

    #[test]
    fn test_find_offsets() {
        assert_eq!(find_offsets("the cat and the dog", "the"), vec![0, 13]);
        assert_eq!(find_offsets("aaaa", "aa"), vec![0, 2]);
        assert_eq!(find_offsets("abc", "x"), Vec::<usize>::new());
        assert_eq!(find_offsets("abc", ""), Vec::<usize>::new());
    }

    #[test]
    fn test_find_offsets_counts_characters() {
        assert_eq!(find_offsets("café the thé the", "the"), vec![5, 13]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let layout = layout();
        let docs = vec![
            doc(&layout, 2, "Harbor Survey", "THE harbor in 1921"),
            doc(&layout, 1, "Letter", "dear sir"),
        ];

        let hits = search_documents(&docs, "HARBOR");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id(), 2);
        assert_eq!(hits[0].meta_matches, vec!["Title".to_string()]);
        assert_eq!(hits[0].text_matches, vec![4]);
    }

    #[test]
    fn test_search_matches_metadata_only() {
        let layout = layout();
        let docs = vec![doc(&layout, 5, "Deed of Sale", "")];

        let hits = search_documents(&docs, "sale");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text_matches.is_empty());
    }

    #[test]
    fn test_search_orders_and_dedups_by_id() {
        let layout = layout();
        let docs = vec![
            doc(&layout, 9, "map", "map"),
            doc(&layout, 3, "map", ""),
            doc(&layout, 9, "map duplicate", "map map"),
        ];

        let hits = search_documents(&docs, "map");
        let ids: Vec<u64> = hits.iter().map(|h| h.document.id()).collect();
        assert_eq!(ids, vec![3, 9]);
        assert_eq!(hits[1].document.title(), "map");
    }

    #[test]
    fn test_empty_term_and_no_matches() {
        let layout = layout();
        let docs = vec![doc(&layout, 1, "Letter", "text")];
        assert!(search_documents(&docs, "").is_empty());
        assert!(search_documents(&docs, "zebra").is_empty());
    }

    #[test]
    fn test_file_name_is_searchable() {
        let layout = layout();
        let docs = vec![doc(&layout, 12, "", "")];
        let hits = search_documents(&docs, "document12image");
        assert_eq!(hits[0].meta_matches, vec!["File Name".to_string()]);
    }

    #[test]
    fn test_hit_summary_serializes() {
        let layout = layout();
        let hit = search_documents(&[doc(&layout, 4, "Deed", "the deed")], "deed")
            .pop()
            .unwrap();
        let json = serde_json::to_value(hit.summary()).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["image_file"], "document4image.jpg");
        assert_eq!(json["text_matches"], serde_json::json!([4]));
    }
}
