//! Literature topic modeling pipeline.
//!
//! This library turns PubMed search results into topic models: it fetches
//! MEDLINE records, normalizes abstracts into lemma tokens, builds a pruned
//! bag-of-words corpus, fits a latent Dirichlet allocation model and renders
//! word clouds and an interactive topic browser.
//!
//! # Architecture
//!
//! The library is organized into the following modules, one per pipeline stage:
//! - [`retrieval`] - E-utilities search/fetch, MEDLINE parsing, article dataset
//! - [`text`] - Abstract normalization into lemma tokens
//! - [`corpus`] - Vocabulary construction, pruning and bag-of-words encoding
//! - [`model`] - Topic model training and persistence
//! - [`viz`] - Word clouds and the HTML topic browser

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod corpus;
pub mod fs_policy;
pub mod model;
pub mod retrieval;
pub mod text;
pub mod viz;

mod user_agent;
mod utils;

// Re-export commonly used types
pub use corpus::{
    BuildReport, Corpus, CorpusBuilder, CorpusError, EncodedDocument, PruneThresholds, TermId,
    ValidationError, Vocabulary,
};
pub use fs_policy::DirectoryPolicy;
pub use model::{LdaParams, LdaTrainer, ModelError, TopicModel};
pub use retrieval::{
    ArticleTable, BibliographicSource, EntrezClient, EntrezConfig, MedlineRecord,
    RetrievalError, SearchQuery, fetch_with_retry,
};
pub use text::{NonStringPolicy, Normalizer, TextError};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, XError>` explicitly in function signatures.
