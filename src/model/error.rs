//! Error types for topic model training and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fitting, saving or loading a topic model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Training parameters are out of range.
    #[error("invalid LDA parameters: {reason}")]
    InvalidParams {
        /// Which parameter is wrong and why.
        reason: String,
    },

    /// Nothing survived pruning, so there is nothing to model.
    #[error("vocabulary is empty; loosen the pruning thresholds")]
    EmptyVocabulary,

    /// Every document encodes to zero tokens.
    #[error("corpus of {documents} documents contains no tokens")]
    EmptyCorpus {
        /// Number of (empty) documents.
        documents: usize,
    },

    /// A document references a term id the vocabulary does not have.
    #[error("document {document} references term id {term} but the vocabulary has {vocabulary} terms")]
    TermOutOfRange {
        /// Zero-based document index.
        document: usize,
        /// Offending term id.
        term: u32,
        /// Vocabulary size.
        vocabulary: usize,
    },

    /// File system error while reading or writing the model.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Model path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The model file decoded but its shapes are inconsistent.
    #[error("corrupt model file {path}: {reason}")]
    Corrupt {
        /// Model path.
        path: PathBuf,
        /// Violated invariant.
        reason: String,
    },
}

impl ModelError {
    /// Creates an invalid-parameter error.
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt-file error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
