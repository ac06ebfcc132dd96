//! Error types for the corpus module.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed builder input.
///
/// Raised before any vocabulary or corpus output is produced; nothing is
/// coerced into shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The document collection has no documents at all.
    #[error("document collection is empty")]
    EmptyCollection,

    /// The token file root is not a list of documents.
    #[error("expected a list of documents, found {found}")]
    NotAList {
        /// JSON type found at the root.
        found: &'static str,
    },

    /// A document entry is not a list of tokens.
    #[error("document {index} is not a list of tokens (found {found})")]
    DocumentNotAList {
        /// Zero-based document index.
        index: usize,
        /// JSON type found instead.
        found: &'static str,
    },

    /// A token inside a document is not a string.
    #[error("document {document}, token {position} is not a string (found {found})")]
    TokenNotAString {
        /// Zero-based document index.
        document: usize,
        /// Zero-based token position inside the document.
        position: usize,
        /// JSON type found instead.
        found: &'static str,
    },

    /// The relative document-frequency ceiling is not a fraction.
    #[error("max document fraction must be within [0, 1], got {value}")]
    InvalidMaxFraction {
        /// The rejected value.
        value: f64,
    },
}

/// Errors raised while building, saving or loading vocabulary and corpus artifacts.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Input failed validation.
    #[error("invalid corpus input: {0}")]
    Validation(#[from] ValidationError),

    /// File system error while reading or writing an artifact.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// JSON artifact could not be encoded or decoded.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Artifact path.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Matrix Market corpus file is malformed.
    #[error("malformed Matrix Market file {path} at line {line}: {reason}")]
    MatrixMarket {
        /// Corpus file path.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Artifact decoded but violates vocabulary invariants.
    #[error("corrupt vocabulary artifact {path}: {reason}")]
    Corrupt {
        /// Artifact path.
        path: PathBuf,
        /// Violated invariant.
        reason: String,
    },
}

impl CorpusError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Creates a Matrix Market parse error.
    pub fn matrix_market(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::MatrixMarket {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Creates a corrupt-artifact error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Names the JSON type of a value for validation messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
