//! `preprocess`: lemmatize abstracts from the dataset.

use anyhow::{Context, Result};
use litopics_core::Normalizer;
use litopics_core::corpus::save_documents;
use litopics_core::retrieval::{ABSTRACT_COLUMN, read_column};
use tracing::info;

use crate::app_config::PipelineConfig;

pub fn run_preprocess_command(config: &PipelineConfig) -> Result<()> {
    let dataset = config.dataset_path();
    let abstracts = read_column(&dataset, ABSTRACT_COLUMN)
        .with_context(|| format!("Failed to read abstracts from '{}'", dataset.display()))?;

    let normalizer = Normalizer::new(config.non_string_policy);
    let documents = normalizer
        .normalize_all(abstracts.iter().map(Option::as_deref))
        .context("Failed to preprocess abstracts")?;

    let path = config.lemmas_path();
    save_documents(&documents, &path, config.directory_policy)
        .with_context(|| format!("Failed to write lemmas '{}'", path.display()))?;
    info!(documents = documents.len(), path = %path.display(), "lemmas written");
    Ok(())
}
