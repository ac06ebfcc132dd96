//! Error types for the retrieval module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while searching or fetching bibliographic records.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body ended before it was completely read.
    ///
    /// This is the one failure class recovered by a single delayed retry.
    #[error("incomplete read from {url}: {detail}")]
    IncompleteRead {
        /// The request URL.
        url: String,
        /// Description of the underlying read failure.
        detail: String,
    },

    /// The response was read but could not be understood.
    #[error("invalid response from {url}: {reason}")]
    InvalidResponse {
        /// The request URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint URL {url}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The search parameters cannot produce a valid request.
    #[error("invalid search query: {reason}")]
    InvalidQuery {
        /// What is wrong with the query.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Construction failure detail.
        reason: String,
    },
}

impl RetrievalError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an incomplete-read error.
    pub fn incomplete_read(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::IncompleteRead {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid-query error.
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Whether this error is the transient class that earns one retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::IncompleteRead { .. })
    }
}

/// Errors reading or writing the tabular article dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// CSV encoding or decoding failed (includes the underlying IO errors).
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Dataset path.
        path: PathBuf,
        /// The underlying csv error.
        #[source]
        source: csv::Error,
    },

    /// File system error outside CSV handling (directory preparation, rename).
    #[error("IO error on {path}: {source}")]
    Io {
        /// Dataset path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The requested column is not in the header row.
    #[error("column {column} not found in {path}")]
    MissingColumn {
        /// Dataset path.
        path: PathBuf,
        /// Requested column name.
        column: String,
    },
}

impl DatasetError {
    /// Creates a CSV error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
