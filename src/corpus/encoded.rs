//! Sparse bag-of-words documents and the corpus that holds them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::vocabulary::TermId;

/// Sparse term counts of one document, sorted by term id.
///
/// Every stored count is at least 1; ids not present have count zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedDocument {
    entries: Vec<(TermId, u32)>,
}

impl EncodedDocument {
    /// Creates an empty encoded document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from per-id counts, discarding zero counts.
    #[must_use]
    pub fn from_counts(counts: HashMap<TermId, u32>) -> Self {
        let mut entries: Vec<(TermId, u32)> =
            counts.into_iter().filter(|(_, count)| *count > 0).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        Self { entries }
    }

    /// Builds a document from `(id, count)` pairs, summing repeated ids.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (TermId, u32)>,
    {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for (id, count) in pairs {
            *counts.entry(id).or_default() += count;
        }
        Self::from_counts(counts)
    }

    /// The `(id, count)` pairs in ascending id order.
    #[must_use]
    pub fn entries(&self) -> &[(TermId, u32)] {
        &self.entries
    }

    /// Iterates `(id, count)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, u32)> + '_ {
        self.entries.iter().copied()
    }

    /// Count of a term id in this document.
    #[must_use]
    pub fn count(&self, id: TermId) -> u32 {
        self.entries
            .binary_search_by_key(&id, |(entry_id, _)| *entry_id)
            .map_or(0, |index| self.entries[index].1)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| u64::from(*count)).sum()
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no retained terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered encoded documents, aligned with the input document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<EncodedDocument>,
}

impl Corpus {
    /// Wraps encoded documents.
    #[must_use]
    pub fn new(documents: Vec<EncodedDocument>) -> Self {
        Self { documents }
    }

    /// Encoded documents in input order.
    #[must_use]
    pub fn documents(&self) -> &[EncodedDocument] {
        &self.documents
    }

    /// Iterates encoded documents in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, EncodedDocument> {
        self.documents.iter()
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total number of non-zero `(document, term)` entries.
    #[must_use]
    pub fn num_nnz(&self) -> usize {
        self.documents.iter().map(EncodedDocument::len).sum()
    }

    /// Total token count across all documents.
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.documents.iter().map(EncodedDocument::total).sum()
    }

    /// Number of documents with no retained terms.
    #[must_use]
    pub fn empty_documents(&self) -> usize {
        self.documents.iter().filter(|doc| doc.is_empty()).count()
    }

    /// Largest term id referenced, if any.
    #[must_use]
    pub fn max_term_id(&self) -> Option<TermId> {
        self.documents
            .iter()
            .filter_map(|doc| doc.entries().last().map(|(id, _)| *id))
            .max()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a EncodedDocument;
    type IntoIter = std::slice::Iter<'a, EncodedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
