//! Collapsed Gibbs sampling for latent Dirichlet allocation.
//!
//! Each token carries one topic assignment. A sweep removes every token from
//! the count tables in turn and redraws its topic from
//!
//! ```text
//! p(z = k) ∝ (n_dk + α) · (n_kw + η) / (n_k + V·η)
//! ```
//!
//! The generator is seeded, so a given corpus and parameter set always yields
//! the same counts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::LdaParams;
use crate::corpus::Corpus;

/// Sweeps between progress log lines.
const PROGRESS_EVERY: usize = 50;

/// Count tables after the final sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TopicCounts {
    pub num_topics: usize,
    pub num_terms: usize,
    /// Row-major `documents × topics`.
    pub doc_topic: Vec<u32>,
    /// Row-major `topics × terms`.
    pub topic_term: Vec<u32>,
    pub topic_totals: Vec<u32>,
    pub doc_totals: Vec<u32>,
}

/// Runs the sampler. The caller has checked that every term id is below
/// `num_terms`, that the corpus holds at least one token and that `params`
/// validate.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn sample(corpus: &Corpus, num_terms: usize, params: &LdaParams) -> TopicCounts {
    let k = params.num_topics;
    let v = num_terms;
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut tokens: Vec<(usize, usize)> = Vec::new();
    for (doc, document) in corpus.iter().enumerate() {
        for (term, count) in document.iter() {
            for _ in 0..count {
                tokens.push((doc, term as usize));
            }
        }
    }

    let mut counts = TopicCounts {
        num_topics: k,
        num_terms: v,
        doc_topic: vec![0; corpus.len() * k],
        topic_term: vec![0; k * v],
        topic_totals: vec![0; k],
        doc_totals: vec![0; corpus.len()],
    };

    let mut assignments = Vec::with_capacity(tokens.len());
    for &(doc, term) in &tokens {
        let topic = rng.gen_range(0..k);
        assignments.push(topic);
        counts.doc_topic[doc * k + topic] += 1;
        counts.topic_term[topic * v + term] += 1;
        counts.topic_totals[topic] += 1;
        counts.doc_totals[doc] += 1;
    }

    let alpha = params.alpha;
    let eta = params.eta;
    let v_eta = v as f64 * eta;
    let mut cumulative = vec![0.0_f64; k];

    for sweep in 0..params.iterations {
        for (index, &(doc, term)) in tokens.iter().enumerate() {
            let old = assignments[index];
            counts.doc_topic[doc * k + old] -= 1;
            counts.topic_term[old * v + term] -= 1;
            counts.topic_totals[old] -= 1;

            let mut total = 0.0;
            for (topic, slot) in cumulative.iter_mut().enumerate() {
                let doc_part = f64::from(counts.doc_topic[doc * k + topic]) + alpha;
                let term_part = f64::from(counts.topic_term[topic * v + term]) + eta;
                let norm = f64::from(counts.topic_totals[topic]) + v_eta;
                total += doc_part * term_part / norm;
                *slot = total;
            }

            let draw = rng.r#gen::<f64>() * total;
            let new = cumulative.partition_point(|&c| c <= draw).min(k - 1);

            assignments[index] = new;
            counts.doc_topic[doc * k + new] += 1;
            counts.topic_term[new * v + term] += 1;
            counts.topic_totals[new] += 1;
        }

        if (sweep + 1) % PROGRESS_EVERY == 0 {
            debug!(sweep = sweep + 1, of = params.iterations, "gibbs sweep");
        } else {
            trace!(sweep = sweep + 1, "gibbs sweep");
        }
    }

    counts
}
