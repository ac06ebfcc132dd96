//! Term to id mapping with document-frequency statistics.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::encoded::EncodedDocument;
use super::error::ValidationError;

/// Dense integer identifier of a vocabulary term.
pub type TermId = u32;

/// Default minimum absolute document frequency.
pub const DEFAULT_MIN_DF: usize = 100;

/// Default maximum document frequency as a fraction of the collection size.
pub const DEFAULT_MAX_DF_FRACTION: f64 = 0.5;

/// Document-frequency bounds applied by [`Vocabulary::prune`].
///
/// A term survives iff `df >= min_df` and `df <= max_df_fraction * num_docs`.
/// `keep_n` optionally caps the surviving set to the most frequent terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneThresholds {
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum share of documents a term may appear in.
    pub max_df_fraction: f64,
    /// Keep at most this many terms (highest document frequency first).
    pub keep_n: Option<usize>,
}

impl Default for PruneThresholds {
    fn default() -> Self {
        Self {
            min_df: DEFAULT_MIN_DF,
            max_df_fraction: DEFAULT_MAX_DF_FRACTION,
            keep_n: None,
        }
    }
}

impl PruneThresholds {
    /// Creates thresholds without a vocabulary size cap.
    #[must_use]
    pub fn new(min_df: usize, max_df_fraction: f64) -> Self {
        Self {
            min_df,
            max_df_fraction,
            keep_n: None,
        }
    }

    /// Returns a copy that keeps at most `keep_n` terms.
    #[must_use]
    pub fn with_keep_n(mut self, keep_n: usize) -> Self {
        self.keep_n = Some(keep_n);
        self
    }

    /// Checks that the fraction bound is a real number in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMaxFraction`] otherwise.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_df_fraction.is_nan() || !(0.0..=1.0).contains(&self.max_df_fraction) {
            return Err(ValidationError::InvalidMaxFraction {
                value: self.max_df_fraction,
            });
        }
        Ok(())
    }

    /// Largest admissible document frequency for a collection of `num_docs`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn max_df(&self, num_docs: usize) -> usize {
        (self.max_df_fraction * num_docs as f64).floor() as usize
    }

    /// Whether a term with document frequency `df` is within both bounds.
    #[must_use]
    pub fn admits(&self, df: usize, num_docs: usize) -> bool {
        df >= self.min_df && df <= self.max_df(num_docs)
    }
}

/// Outcome of a pruning pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PruneSummary {
    /// Terms present before pruning.
    pub before: usize,
    /// Terms removed for appearing in too few documents.
    pub below_min_df: usize,
    /// Terms removed for appearing in too many documents.
    pub above_max_df: usize,
    /// Terms removed by the `keep_n` cap.
    pub over_keep_n: usize,
}

impl PruneSummary {
    /// Total number of removed terms.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.below_min_df + self.above_max_df + self.over_keep_n
    }

    /// Number of surviving terms.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.before - self.removed()
    }
}

/// Bidirectional term/id mapping built from tokenized documents.
///
/// Ids are dense and start at 0. New terms are numbered in the order documents
/// are added; the unseen terms of one document are numbered in lexicographic
/// order, so the assignment depends only on the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VocabularyRepr", try_from = "VocabularyRepr")]
pub struct Vocabulary {
    token2id: HashMap<String, TermId>,
    id2token: Vec<String>,
    dfs: Vec<usize>,
    cfs: Vec<usize>,
    num_docs: usize,
    num_pos: usize,
    num_nnz: usize,
}

impl Vocabulary {
    /// Creates an empty vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unpruned vocabulary from a collection of documents.
    #[must_use]
    pub fn from_documents<D, S>(documents: &[D]) -> Self
    where
        D: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self::new();
        for document in documents {
            vocabulary.add_document(document.as_ref());
        }
        vocabulary
    }

    /// Adds one document, assigning ids to unseen terms and updating statistics.
    pub fn add_document<S: AsRef<str>>(&mut self, document: &[S]) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in document {
            *counts.entry(token.as_ref()).or_default() += 1;
        }

        let unseen: BTreeSet<&str> = counts
            .keys()
            .copied()
            .filter(|term| !self.token2id.contains_key(*term))
            .collect();
        for term in unseen {
            let id = self.next_id();
            self.token2id.insert(term.to_string(), id);
            self.id2token.push(term.to_string());
            self.dfs.push(0);
            self.cfs.push(0);
        }

        for (term, count) in &counts {
            if let Some(&id) = self.token2id.get(*term) {
                let index = id as usize;
                self.dfs[index] += 1;
                self.cfs[index] += count;
            }
        }

        self.num_docs += 1;
        self.num_pos += document.len();
        self.num_nnz += counts.len();
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_id(&self) -> TermId {
        self.id2token.len() as TermId
    }

    /// Removes terms outside the document-frequency bounds and renumbers ids.
    ///
    /// Surviving ids keep their relative order. Statistics about the documents
    /// seen (`num_docs`, `num_pos`, `num_nnz`) describe the input collection and
    /// are not recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMaxFraction`] for an out-of-range fraction.
    #[instrument(skip(self), fields(terms = self.len(), num_docs = self.num_docs))]
    pub fn prune(&mut self, thresholds: &PruneThresholds) -> Result<PruneSummary, ValidationError> {
        thresholds.validate()?;

        let max_df = thresholds.max_df(self.num_docs);
        let mut summary = PruneSummary {
            before: self.len(),
            ..PruneSummary::default()
        };

        let mut keep: Vec<usize> = Vec::with_capacity(self.len());
        for (index, &df) in self.dfs.iter().enumerate() {
            if df < thresholds.min_df {
                summary.below_min_df += 1;
            } else if df > max_df {
                summary.above_max_df += 1;
            } else {
                keep.push(index);
            }
        }

        if let Some(keep_n) = thresholds.keep_n
            && keep.len() > keep_n
        {
            let mut by_frequency = keep.clone();
            by_frequency.sort_by(|a, b| self.dfs[*b].cmp(&self.dfs[*a]).then(a.cmp(b)));
            let allowed: HashSet<usize> = by_frequency.into_iter().take(keep_n).collect();
            summary.over_keep_n = keep.len() - keep_n;
            keep.retain(|index| allowed.contains(index));
        }

        self.compact(&keep);

        debug!(
            retained = summary.retained(),
            below_min_df = summary.below_min_df,
            above_max_df = summary.above_max_df,
            over_keep_n = summary.over_keep_n,
            max_df,
            "vocabulary pruned"
        );
        Ok(summary)
    }

    /// Keeps only the given old ids (ascending) and renumbers them densely.
    fn compact(&mut self, keep: &[usize]) {
        let mut id2token = Vec::with_capacity(keep.len());
        let mut dfs = Vec::with_capacity(keep.len());
        let mut cfs = Vec::with_capacity(keep.len());
        for &old in keep {
            id2token.push(std::mem::take(&mut self.id2token[old]));
            dfs.push(self.dfs[old]);
            cfs.push(self.cfs[old]);
        }
        self.token2id = index_terms(&id2token);
        self.id2token = id2token;
        self.dfs = dfs;
        self.cfs = cfs;
    }

    /// Encodes a document as sparse term counts; unknown terms are dropped.
    #[must_use]
    pub fn encode<S: AsRef<str>>(&self, document: &[S]) -> EncodedDocument {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for token in document {
            if let Some(&id) = self.token2id.get(token.as_ref()) {
                *counts.entry(id).or_default() += 1;
            }
        }
        EncodedDocument::from_counts(counts)
    }

    /// Looks up the id of a term.
    #[must_use]
    pub fn id(&self, term: &str) -> Option<TermId> {
        self.token2id.get(term).copied()
    }

    /// Looks up the term of an id.
    #[must_use]
    pub fn term(&self, id: TermId) -> Option<&str> {
        self.id2token.get(id as usize).map(String::as_str)
    }

    /// Terms in id order.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.id2token
    }

    /// Iterates `(id, term)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str)> {
        self.id2token
            .iter()
            .enumerate()
            .map(|(index, term)| (term_id(index), term.as_str()))
    }

    /// Number of documents containing the term with this id.
    #[must_use]
    pub fn document_frequency(&self, id: TermId) -> Option<usize> {
        self.dfs.get(id as usize).copied()
    }

    /// Total occurrences of the term with this id across the collection.
    #[must_use]
    pub fn collection_frequency(&self, id: TermId) -> Option<usize> {
        self.cfs.get(id as usize).copied()
    }

    /// Number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    /// Whether the vocabulary has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    /// Number of documents added.
    #[must_use]
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Number of tokens processed across all added documents.
    #[must_use]
    pub fn num_pos(&self) -> usize {
        self.num_pos
    }

    /// Number of distinct (document, term) pairs across all added documents.
    #[must_use]
    pub fn num_nnz(&self) -> usize {
        self.num_nnz
    }
}

#[allow(clippy::cast_possible_truncation)]
fn term_id(index: usize) -> TermId {
    index as TermId
}

fn index_terms(id2token: &[String]) -> HashMap<String, TermId> {
    id2token
        .iter()
        .enumerate()
        .map(|(index, term)| (term.clone(), term_id(index)))
        .collect()
}

/// On-disk shape of a vocabulary (`dictionary.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabularyRepr {
    num_docs: usize,
    num_pos: usize,
    num_nnz: usize,
    terms: Vec<String>,
    dfs: Vec<usize>,
    cfs: Vec<usize>,
}

impl From<Vocabulary> for VocabularyRepr {
    fn from(vocabulary: Vocabulary) -> Self {
        Self {
            num_docs: vocabulary.num_docs,
            num_pos: vocabulary.num_pos,
            num_nnz: vocabulary.num_nnz,
            terms: vocabulary.id2token,
            dfs: vocabulary.dfs,
            cfs: vocabulary.cfs,
        }
    }
}

impl TryFrom<VocabularyRepr> for Vocabulary {
    type Error = String;

    fn try_from(repr: VocabularyRepr) -> Result<Self, Self::Error> {
        if repr.dfs.len() != repr.terms.len() || repr.cfs.len() != repr.terms.len() {
            return Err(format!(
                "{} terms but {} document and {} collection frequencies",
                repr.terms.len(),
                repr.dfs.len(),
                repr.cfs.len()
            ));
        }
        let token2id = index_terms(&repr.terms);
        if token2id.len() != repr.terms.len() {
            return Err("duplicate terms".to_string());
        }
        if let Some(df) = repr.dfs.iter().find(|&&df| df > repr.num_docs) {
            return Err(format!(
                "document frequency {df} exceeds document count {}",
                repr.num_docs
            ));
        }
        Ok(Self {
            token2id,
            id2token: repr.terms,
            dfs: repr.dfs,
            cfs: repr.cfs,
            num_docs: repr.num_docs,
            num_pos: repr.num_pos,
            num_nnz: repr.num_nnz,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn docs(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|doc| doc.iter().map(|t| (*t).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_ids_follow_first_document_then_lexicographic_order() {
        let vocabulary = Vocabulary::from_documents(&docs(&[
            &["zeta", "alpha", "zeta"],
            &["beta", "alpha"],
        ]));
        assert_eq!(vocabulary.id("alpha"), Some(0));
        assert_eq!(vocabulary.id("zeta"), Some(1));
        assert_eq!(vocabulary.id("beta"), Some(2));
        assert_eq!(vocabulary.term(2), Some("beta"));
    }

    #[test]
    fn test_statistics_track_documents_and_tokens() {
        let vocabulary =
            Vocabulary::from_documents(&docs(&[&["a", "b", "a"], &["b"], &[]]));
        assert_eq!(vocabulary.num_docs(), 3);
        assert_eq!(vocabulary.num_pos(), 4);
        assert_eq!(vocabulary.num_nnz(), 3);
        let a = vocabulary.id("a").unwrap();
        let b = vocabulary.id("b").unwrap();
        assert_eq!(vocabulary.document_frequency(a), Some(1));
        assert_eq!(vocabulary.collection_frequency(a), Some(2));
        assert_eq!(vocabulary.document_frequency(b), Some(2));
    }

    #[test]
    fn test_prune_renumbers_preserving_relative_order() {
        let mut vocabulary = Vocabulary::from_documents(&docs(&[
            &["rare", "common", "mid"],
            &["common", "mid"],
            &["common", "other"],
        ]));
        // ids: common=0, mid=1, rare=2, other=3
        let summary = vocabulary.prune(&PruneThresholds::new(2, 1.0)).unwrap();
        assert_eq!(summary.below_min_df, 2);
        assert_eq!(vocabulary.terms(), &["common".to_string(), "mid".to_string()]);
        assert_eq!(vocabulary.id("mid"), Some(1));
        assert_eq!(vocabulary.id("rare"), None);
    }

    #[test]
    fn test_prune_removes_terms_above_fraction() {
        let mut vocabulary = Vocabulary::from_documents(&docs(&[
            &["the", "cell"],
            &["the", "gene"],
            &["the", "cell"],
            &["gene", "protein"],
        ]));
        let summary = vocabulary.prune(&PruneThresholds::new(1, 0.5)).unwrap();
        assert_eq!(summary.above_max_df, 1);
        assert!(vocabulary.id("the").is_none());
        assert!(vocabulary.id("cell").is_some());
        assert!(vocabulary.id("protein").is_some());
    }

    #[test]
    fn test_keep_n_prefers_frequent_then_lower_id() {
        let mut vocabulary = Vocabulary::from_documents(&docs(&[
            &["a", "b", "c"],
            &["c", "b"],
            &["c"],
        ]));
        let thresholds = PruneThresholds::new(1, 1.0).with_keep_n(2);
        let summary = vocabulary.prune(&thresholds).unwrap();
        assert_eq!(summary.over_keep_n, 1);
        assert_eq!(vocabulary.terms(), &["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_prune_rejects_fraction_outside_unit_interval() {
        let mut vocabulary = Vocabulary::from_documents(&docs(&[&["a"]]));
        assert!(vocabulary.prune(&PruneThresholds::new(1, 1.5)).is_err());
        assert!(vocabulary.prune(&PruneThresholds::new(1, f64::NAN)).is_err());
        assert_eq!(vocabulary.len(), 1, "failed prune must not mutate");
    }

    #[test]
    fn test_encode_drops_unknown_terms_and_sorts_by_id() {
        let vocabulary = Vocabulary::from_documents(&docs(&[&["b", "a"]]));
        let encoded = vocabulary.encode(&["b", "x", "b", "a"]);
        assert_eq!(encoded.entries(), &[(0, 1), (1, 2)]);
    }

    #[test]
    fn test_serde_round_trip_rebuilds_lookup() {
        let vocabulary = Vocabulary::from_documents(&docs(&[&["gene", "cell"], &["cell"]]));
        let json = serde_json::to_string(&vocabulary).unwrap();
        let restored: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, vocabulary);
        assert_eq!(restored.id("gene"), vocabulary.id("gene"));
    }

    #[test]
    fn test_deserialize_rejects_duplicate_terms() {
        let json = r#"{"num_docs":1,"num_pos":2,"num_nnz":2,"terms":["a","a"],"dfs":[1,1],"cfs":[1,1]}"#;
        let result: Result<Vocabulary, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
