//! Read-only renderings of the corpus and the fitted model.
//!
//! - [`most_common_terms`] ranks lemmas across all documents.
//! - [`WordCloud`] lays weighted words out on a canvas and writes SVG.
//! - [`browser`] writes a self-contained HTML page for exploring topics.

pub mod browser;
mod palette;
mod wordcloud;

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

pub use browser::{BrowserData, BrowserOptions, DEFAULT_LAMBDA, DEFAULT_RELEVANT_TERMS};
pub use palette::spectral;
pub use wordcloud::{Placement, WordCloud, WordCloudLayout};

/// Words shown in the corpus-wide cloud.
pub const DEFAULT_COMMON_WORDS: usize = 50;

/// Terms per topic cloud.
pub const DEFAULT_TOPIC_WORDS: usize = 25;

/// Errors raised while rendering visualizations.
#[derive(Debug, Error)]
pub enum VizError {
    /// Nothing to draw.
    #[error("no words to draw in the word cloud")]
    NoWords,

    /// Canvas or font settings cannot produce a layout.
    #[error("invalid word cloud settings: {reason}")]
    InvalidSettings {
        /// What is wrong.
        reason: String,
    },

    /// The model cannot be shown as requested.
    #[error("cannot visualize model: {reason}")]
    InvalidModel {
        /// What is wrong.
        reason: String,
    },

    /// Browser data could not be encoded.
    #[error("failed to encode browser data: {0}")]
    Encode(#[from] serde_json::Error),

    /// File system error while writing output.
    #[error("IO error on {path}: {source}")]
    Io {
        /// Output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl VizError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// The `n` most frequent terms across `documents`, with their counts.
///
/// Ties keep the order in which terms first appear.
#[must_use]
pub fn most_common_terms<D, S>(documents: &[D], n: usize) -> Vec<(String, usize)>
where
    D: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut next = 0;
    for document in documents {
        for term in document.as_ref() {
            let entry = counts.entry(term.as_ref()).or_insert_with(|| {
                next += 1;
                (0, next)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
    ranked
        .into_iter()
        .take(n)
        .map(|(term, (count, _))| (term.to_string(), count))
        .collect()
}
