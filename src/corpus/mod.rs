//! Vocabulary construction, pruning and bag-of-words encoding.
//!
//! This is the data-preparation contract in front of the topic model trainer:
//!
//! 1. Every document is scanned once to build a [`Vocabulary`] with document
//!    frequencies.
//! 2. Terms outside the [`PruneThresholds`] are removed and the surviving ids
//!    are renumbered densely, preserving their relative order.
//! 3. Every document is encoded against the final vocabulary as an
//!    [`EncodedDocument`] of sparse term counts.
//!
//! # Example
//!
//! ```
//! use litopics_core::corpus::{CorpusBuilder, PruneThresholds};
//!
//! let documents = vec![
//!     vec!["cat".to_string(), "dog".to_string(), "cat".to_string()],
//!     vec!["dog".to_string(), "bird".to_string()],
//!     vec!["cat".to_string(), "bird".to_string(), "dog".to_string()],
//! ];
//! let built = CorpusBuilder::new(PruneThresholds::new(2, 1.0))
//!     .build(&documents)
//!     .unwrap();
//! assert_eq!(built.vocabulary.id("cat"), Some(0));
//! assert_eq!(built.corpus.documents()[0].count(0), 2);
//! ```

mod encoded;
mod error;
mod persist;
mod vocabulary;

pub use encoded::{Corpus, EncodedDocument};
pub use error::{CorpusError, ValidationError};
pub use persist::{
    documents_from_json, load_corpus, load_documents, load_vocabulary, save_corpus,
    save_documents, save_vocabulary,
};
pub use vocabulary::{
    DEFAULT_MAX_DF_FRACTION, DEFAULT_MIN_DF, PruneSummary, PruneThresholds, TermId, Vocabulary,
};

use tracing::{info, instrument, warn};

/// Summary of one build, for logging and degenerate-corpus detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of input documents.
    pub documents: usize,
    /// Distinct terms before pruning.
    pub terms_seen: usize,
    /// Terms that survived pruning.
    pub terms_retained: usize,
    /// Documents left with no retained term.
    pub empty_documents: usize,
    /// Detail of the pruning pass.
    pub pruning: PruneSummary,
}

impl BuildReport {
    /// Whether pruning removed every term, leaving nothing to model.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.terms_retained == 0
    }
}

/// Output of [`CorpusBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltCorpus {
    /// Pruned vocabulary.
    pub vocabulary: Vocabulary,
    /// Documents encoded against `vocabulary`, in input order.
    pub corpus: Corpus,
    /// Build statistics.
    pub report: BuildReport,
}

/// Builds a pruned vocabulary and its encoded corpus from tokenized documents.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    thresholds: PruneThresholds,
}

impl CorpusBuilder {
    /// Creates a builder with the given pruning thresholds.
    #[must_use]
    pub fn new(thresholds: PruneThresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds applied by this builder.
    #[must_use]
    pub fn thresholds(&self) -> &PruneThresholds {
        &self.thresholds
    }

    /// Builds vocabulary and corpus.
    ///
    /// If pruning removes every term the result is an empty vocabulary and a
    /// corpus of empty documents; this is reported through
    /// [`BuildReport::is_degenerate`] and a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCollection`] for zero documents and
    /// [`ValidationError::InvalidMaxFraction`] for an out-of-range fraction.
    /// Validation happens before any work is done.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub fn build<D, S>(&self, documents: &[D]) -> Result<BuiltCorpus, ValidationError>
    where
        D: AsRef<[S]>,
        S: AsRef<str>,
    {
        if documents.is_empty() {
            return Err(ValidationError::EmptyCollection);
        }
        self.thresholds.validate()?;

        let mut vocabulary = Vocabulary::from_documents(documents);
        let pruning = vocabulary.prune(&self.thresholds)?;

        let corpus = Corpus::new(
            documents
                .iter()
                .map(|document| vocabulary.encode(document.as_ref()))
                .collect(),
        );

        let report = BuildReport {
            documents: documents.len(),
            terms_seen: pruning.before,
            terms_retained: vocabulary.len(),
            empty_documents: corpus.empty_documents(),
            pruning,
        };

        if report.is_degenerate() {
            warn!(
                documents = report.documents,
                terms_seen = report.terms_seen,
                min_df = self.thresholds.min_df,
                max_df_fraction = self.thresholds.max_df_fraction,
                "pruning removed every term; corpus is empty"
            );
        } else {
            info!(
                documents = report.documents,
                terms_seen = report.terms_seen,
                terms_retained = report.terms_retained,
                empty_documents = report.empty_documents,
                nnz = corpus.num_nnz(),
                "corpus built"
            );
        }

        Ok(BuiltCorpus {
            vocabulary,
            corpus,
            report,
        })
    }
}
