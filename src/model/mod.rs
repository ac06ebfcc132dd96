//! Latent Dirichlet allocation over an encoded corpus.
//!
//! [`LdaTrainer`] fits `K` topics with a seeded collapsed Gibbs sampler and
//! returns a [`TopicModel`] holding topic-term and document-topic
//! distributions. Runs are reproducible for a fixed seed, but callers compare
//! models by topic quality (shared top terms), not exact probabilities.

mod error;
mod gibbs;

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub use error::ModelError;

use crate::corpus::{Corpus, Vocabulary};
use crate::fs_policy::{DirectoryPolicy, write_artifact};

/// Default number of topics.
pub const DEFAULT_NUM_TOPICS: usize = 3;

/// Default number of Gibbs sweeps.
pub const DEFAULT_ITERATIONS: usize = 400;

/// Default sampler seed.
pub const DEFAULT_SEED: u64 = 123;

/// Training parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdaParams {
    /// Number of topics `K`.
    pub num_topics: usize,
    /// Gibbs sweeps over the corpus.
    pub iterations: usize,
    /// Symmetric document-topic prior.
    pub alpha: f64,
    /// Symmetric topic-term prior.
    pub eta: f64,
    /// Random seed.
    pub seed: u64,
}

impl LdaParams {
    /// Parameters for `num_topics` topics with `alpha = eta = 1/K`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(num_topics: usize) -> Self {
        let prior = if num_topics == 0 {
            0.0
        } else {
            1.0 / num_topics as f64
        };
        Self {
            num_topics,
            iterations: DEFAULT_ITERATIONS,
            alpha: prior,
            eta: prior,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the number of sweeps.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets both priors.
    #[must_use]
    pub fn with_priors(mut self, alpha: f64, eta: f64) -> Self {
        self.alpha = alpha;
        self.eta = eta;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidParams`] for zero topics, zero sweeps or a
    /// non-positive prior.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_topics == 0 {
            return Err(ModelError::invalid_params("num_topics must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(ModelError::invalid_params("iterations must be at least 1"));
        }
        for (name, value) in [("alpha", self.alpha), ("eta", self.eta)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::invalid_params(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for LdaParams {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_TOPICS)
    }
}

/// Fits topic models.
#[derive(Debug, Clone, Default)]
pub struct LdaTrainer {
    params: LdaParams,
}

impl LdaTrainer {
    /// Creates a trainer.
    #[must_use]
    pub fn new(params: LdaParams) -> Self {
        Self { params }
    }

    /// Parameters in use.
    #[must_use]
    pub fn params(&self) -> &LdaParams {
        &self.params
    }

    /// Fits a model to `corpus`, whose term ids index into `vocabulary`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidParams`], [`ModelError::EmptyVocabulary`],
    /// [`ModelError::EmptyCorpus`] or [`ModelError::TermOutOfRange`]; a
    /// degenerate corpus is refused rather than modeled.
    #[instrument(skip_all, fields(
        topics = self.params.num_topics,
        iterations = self.params.iterations,
        terms = vocabulary.len(),
        documents = corpus.len()
    ))]
    pub fn fit(&self, vocabulary: &Vocabulary, corpus: &Corpus) -> Result<TopicModel, ModelError> {
        self.params.validate()?;
        if vocabulary.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }
        let num_terms = vocabulary.len();
        for (document, encoded) in corpus.iter().enumerate() {
            if let Some((term, _)) = encoded.iter().find(|(id, _)| *id as usize >= num_terms) {
                return Err(ModelError::TermOutOfRange {
                    document,
                    term,
                    vocabulary: num_terms,
                });
            }
        }
        if corpus.total_tokens() == 0 {
            return Err(ModelError::EmptyCorpus {
                documents: corpus.len(),
            });
        }

        let counts = gibbs::sample(corpus, num_terms, &self.params);
        let model = TopicModel::from_counts(vocabulary, corpus, &counts, self.params.clone());
        info!(
            proportions = ?model.topic_proportions(),
            "topic model fitted"
        );
        Ok(model)
    }
}

/// Top terms of one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicTerms {
    /// Topic index.
    pub topic: usize,
    /// `(term, probability)` in decreasing probability.
    pub terms: Vec<(String, f64)>,
}

impl TopicTerms {
    /// Just the terms, in rank order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(term, _)| term.as_str())
    }
}

/// A fitted topic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModel {
    params: LdaParams,
    terms: Vec<String>,
    /// Corpus count of each term, for marginal term probabilities.
    term_counts: Vec<u64>,
    /// Tokens assigned to each topic by the last sweep.
    topic_token_counts: Vec<u64>,
    /// `K × V`, rows sum to one.
    topic_term: Vec<Vec<f64>>,
    /// `D × K`, rows sum to one.
    doc_topic: Vec<Vec<f64>>,
}

impl TopicModel {
    fn from_counts(
        vocabulary: &Vocabulary,
        corpus: &Corpus,
        counts: &gibbs::TopicCounts,
        params: LdaParams,
    ) -> Self {
        let k = counts.num_topics;
        let v = counts.num_terms;
        #[allow(clippy::cast_precision_loss)]
        let v_eta = v as f64 * params.eta;
        #[allow(clippy::cast_precision_loss)]
        let k_alpha = k as f64 * params.alpha;

        let topic_term = (0..k)
            .map(|topic| {
                let norm = f64::from(counts.topic_totals[topic]) + v_eta;
                (0..v)
                    .map(|term| (f64::from(counts.topic_term[topic * v + term]) + params.eta) / norm)
                    .collect()
            })
            .collect();

        let doc_topic = (0..corpus.len())
            .map(|doc| {
                let norm = f64::from(counts.doc_totals[doc]) + k_alpha;
                (0..k)
                    .map(|topic| (f64::from(counts.doc_topic[doc * k + topic]) + params.alpha) / norm)
                    .collect()
            })
            .collect();

        let mut term_counts = vec![0_u64; v];
        for document in corpus {
            for (term, count) in document.iter() {
                term_counts[term as usize] += u64::from(count);
            }
        }

        Self {
            params,
            terms: vocabulary.terms().to_vec(),
            term_counts,
            topic_token_counts: counts.topic_totals.iter().map(|&n| u64::from(n)).collect(),
            topic_term,
            doc_topic,
        }
    }

    /// Training parameters.
    #[must_use]
    pub fn params(&self) -> &LdaParams {
        &self.params
    }

    /// Number of topics.
    #[must_use]
    pub fn num_topics(&self) -> usize {
        self.topic_term.len()
    }

    /// Number of vocabulary terms.
    #[must_use]
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Number of training documents.
    #[must_use]
    pub fn num_documents(&self) -> usize {
        self.doc_topic.len()
    }

    /// Vocabulary terms by id.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Corpus count of each term.
    #[must_use]
    pub fn term_counts(&self) -> &[u64] {
        &self.term_counts
    }

    /// `p(term | topic)` for every term.
    #[must_use]
    pub fn topic_term_distribution(&self, topic: usize) -> Option<&[f64]> {
        self.topic_term.get(topic).map(Vec::as_slice)
    }

    /// `p(topic | document)` for every topic.
    #[must_use]
    pub fn document_topics(&self, document: usize) -> Option<&[f64]> {
        self.doc_topic.get(document).map(Vec::as_slice)
    }

    /// Share of corpus tokens assigned to each topic; sums to one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn topic_proportions(&self) -> Vec<f64> {
        let total: u64 = self.topic_token_counts.iter().sum();
        if total == 0 {
            return vec![0.0; self.num_topics()];
        }
        self.topic_token_counts
            .iter()
            .map(|&n| n as f64 / total as f64)
            .collect()
    }

    /// Top `num_words` terms of every topic, by decreasing probability.
    ///
    /// Equal probabilities keep vocabulary order.
    #[must_use]
    pub fn show_topics(&self, num_words: usize) -> Vec<TopicTerms> {
        self.topic_term
            .iter()
            .enumerate()
            .map(|(topic, row)| {
                let mut ranked: Vec<usize> = (0..row.len()).collect();
                ranked.sort_by(|&a, &b| {
                    row[b]
                        .partial_cmp(&row[a])
                        .unwrap_or(Ordering::Equal)
                        .then(a.cmp(&b))
                });
                let terms = ranked
                    .into_iter()
                    .take(num_words)
                    .map(|id| (self.terms[id].clone(), row[id]))
                    .collect();
                TopicTerms { topic, terms }
            })
            .collect()
    }

    /// Writes the model as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Io`] on write failure.
    #[instrument(skip(self), fields(topics = self.num_topics(), terms = self.num_terms()))]
    pub fn save(&self, path: &Path, policy: DirectoryPolicy) -> Result<(), ModelError> {
        write_artifact(path, policy, |writer| {
            serde_json::to_writer(&mut *writer, self).map_err(std::io::Error::other)
        })
        .map_err(|e| ModelError::io(path, e))
    }

    /// Reads a model written by [`TopicModel::save`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Io`] when unreadable and [`ModelError::Corrupt`]
    /// when the content is not a consistent model.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        let model: Self =
            serde_json::from_str(&raw).map_err(|e| ModelError::corrupt(path, e.to_string()))?;
        model
            .check_shapes()
            .map_err(|reason| ModelError::corrupt(path, reason))?;
        Ok(model)
    }

    fn check_shapes(&self) -> Result<(), String> {
        let k = self.topic_term.len();
        let v = self.terms.len();
        if k == 0 {
            return Err("model has no topics".to_string());
        }
        if k != self.params.num_topics || self.topic_token_counts.len() != k {
            return Err(format!("topic count mismatch: {k} rows"));
        }
        if self.term_counts.len() != v {
            return Err(format!("{} term counts for {v} terms", self.term_counts.len()));
        }
        if let Some(row) = self.topic_term.iter().position(|row| row.len() != v) {
            return Err(format!("topic {row} does not have {v} term weights"));
        }
        if let Some(row) = self.doc_topic.iter().position(|row| row.len() != k) {
            return Err(format!("document {row} does not have {k} topic weights"));
        }
        Ok(())
    }
}
