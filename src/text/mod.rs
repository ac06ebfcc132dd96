//! Abstract normalization into lemma tokens.
//!
//! Every abstract goes through the same stages, in this order:
//!
//! 1. lowercase
//! 2. hyphens become spaces
//! 3. contraction expansion, word by word
//! 4. everything but `a-z` and spaces is removed
//! 5. whitespace tokenization
//! 6. English stopword removal (NLTK list)
//! 7. noun lemmatization
//!
//! The order matters: the stopword list is lowercase and contains no
//! punctuation, and contractions must be expanded before apostrophes are
//! stripped.

mod contractions;
mod lemmatizer;

pub use contractions::expand_contractions;
pub use lemmatizer::lemmatize;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use stop_words::{LANGUAGE, get};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::utils::compile_static_regex;

static NON_LETTERS_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"[^a-z ]"));

/// How to treat abstracts that are missing or not text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonStringPolicy {
    /// Drop them from the output and log how many were dropped.
    #[default]
    Skip,
    /// Fail on the first one.
    Reject,
}

impl NonStringPolicy {
    /// Returns the stable string label used in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Reject => "reject",
        }
    }

    /// Parses a config label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "skip" => Some(Self::Skip),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Errors produced by abstract normalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    /// An input entry was not text while the policy is [`NonStringPolicy::Reject`].
    #[error("abstract {index} is missing or not text")]
    NonString {
        /// Zero-based position in the input.
        index: usize,
    },
}

/// Turns raw abstract strings into lemma token lists.
pub struct Normalizer {
    stopwords: HashSet<String>,
    policy: NonStringPolicy,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("stopwords", &self.stopwords.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NonStringPolicy::default())
    }
}

impl Normalizer {
    /// Creates a normalizer with the English stopword list.
    #[must_use]
    pub fn new(policy: NonStringPolicy) -> Self {
        let stopwords = get(LANGUAGE::English)
            .iter()
            .map(|word| word.to_string().to_lowercase())
            .collect();
        Self { stopwords, policy }
    }

    /// Policy applied to missing inputs.
    #[must_use]
    pub fn policy(&self) -> NonStringPolicy {
        self.policy
    }

    /// Whether `word` is on the stopword list.
    #[must_use]
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Normalizes one abstract.
    #[must_use]
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let dehyphenated = lowered.replace('-', " ");
        let expanded = expand_contractions(&dehyphenated);
        let letters = NON_LETTERS_RE.replace_all(&expanded, "");

        letters
            .split_whitespace()
            .filter(|token| !self.is_stopword(token))
            .map(lemmatize)
            .collect()
    }

    /// Normalizes a batch of abstracts, where `None` marks a missing entry.
    ///
    /// Under [`NonStringPolicy::Skip`] missing entries produce no output
    /// document, so the result can be shorter than the input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::NonString`] for the first missing entry under
    /// [`NonStringPolicy::Reject`]; no documents are returned in that case.
    #[instrument(skip(self, texts), fields(policy = self.policy.as_str()))]
    pub fn normalize_all<'a, I>(&self, texts: I) -> Result<Vec<Vec<String>>, TextError>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        info!("Starting text preprocessing");
        let mut documents = Vec::new();
        let mut skipped = 0_usize;

        for (index, text) in texts.into_iter().enumerate() {
            match (text, self.policy) {
                (Some(text), _) => documents.push(self.normalize(text)),
                (None, NonStringPolicy::Skip) => {
                    debug!(index, "skipping missing abstract");
                    skipped += 1;
                }
                (None, NonStringPolicy::Reject) => return Err(TextError::NonString { index }),
            }
        }

        if skipped > 0 {
            warn!(skipped, "missing abstracts were skipped");
        }
        info!(documents = documents.len(), "Text preprocessing has finished");
        Ok(documents)
    }
}
