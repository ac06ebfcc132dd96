//! `train`: build the pruned corpus and fit the topic model.

use std::fs;

use anyhow::{Context, Result};
use litopics_core::corpus::{load_documents, save_corpus, save_vocabulary};
use litopics_core::{CorpusBuilder, LdaTrainer};
use tracing::{info, warn};

use crate::app_config::PipelineConfig;

pub fn run_train_command(config: &PipelineConfig) -> Result<()> {
    let lemmas = config.lemmas_path();
    let documents = load_documents(&lemmas)
        .with_context(|| format!("Failed to load lemmas '{}'", lemmas.display()))?;

    let built = CorpusBuilder::new(config.thresholds)
        .build(&documents)
        .context("Failed to build the corpus")?;
    info!(
        documents = built.report.documents,
        terms_seen = built.report.terms_seen,
        terms_retained = built.report.terms_retained,
        empty_documents = built.report.empty_documents,
        "corpus built"
    );

    let model = if built.report.is_degenerate() {
        warn!(
            min_df = config.thresholds.min_df,
            max_df_fraction = config.thresholds.max_df_fraction,
            "no terms survived pruning; skipping model training"
        );
        None
    } else {
        let model = LdaTrainer::new(config.lda.clone())
            .fit(&built.vocabulary, &built.corpus)
            .context("Failed to train the topic model")?;
        Some(model)
    };

    let dictionary = config.dictionary_path();
    save_vocabulary(&built.vocabulary, &dictionary, config.directory_policy)
        .with_context(|| format!("Failed to write dictionary '{}'", dictionary.display()))?;
    let corpus = config.corpus_path();
    save_corpus(
        &built.corpus,
        built.vocabulary.len(),
        &corpus,
        config.directory_policy,
    )
    .with_context(|| format!("Failed to write corpus '{}'", corpus.display()))?;

    let model_path = config.model_path();
    let Some(model) = model else {
        // A model from an earlier run no longer matches the dictionary.
        if model_path.exists() {
            fs::remove_file(&model_path).with_context(|| {
                format!("Failed to remove stale model '{}'", model_path.display())
            })?;
        }
        return Ok(());
    };
    model
        .save(&model_path, config.directory_policy)
        .with_context(|| format!("Failed to write model '{}'", model_path.display()))?;

    for topic in model.show_topics(10) {
        let words: Vec<&str> = topic.words().collect();
        info!(topic = topic.topic, words = %words.join(", "), "topic");
    }
    info!(path = %model_path.display(), "model written");
    Ok(())
}
