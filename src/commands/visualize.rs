//! `wordcloud`, `topic-clouds` and `browse`: render the corpus and the model.

use anyhow::{Context, Result};
use litopics_core::TopicModel;
use litopics_core::corpus::load_documents;
use litopics_core::viz::browser::write_browser;
use litopics_core::viz::{BrowserOptions, WordCloud, most_common_terms};
use tracing::{info, warn};

use crate::app_config::PipelineConfig;

pub fn run_wordcloud_command(config: &PipelineConfig) -> Result<()> {
    let lemmas = config.lemmas_path();
    let documents = load_documents(&lemmas)
        .with_context(|| format!("Failed to load lemmas '{}'", lemmas.display()))?;

    #[allow(clippy::cast_precision_loss)]
    let words: Vec<(String, f64)> = most_common_terms(&documents, config.common_words)
        .into_iter()
        .map(|(term, count)| (term, count as f64))
        .collect();
    if words.is_empty() {
        warn!(path = %lemmas.display(), "no tokens to draw; skipping common words cloud");
        return Ok(());
    }

    let cloud = WordCloud {
        max_words: config.common_words,
        ..WordCloud::default()
    };
    let path = config.common_words_path();
    let layout = cloud
        .write_svg(&words, &path, config.directory_policy)
        .with_context(|| format!("Failed to draw '{}'", path.display()))?;
    info!(
        placed = layout.placements.len(),
        path = %path.display(),
        "common words cloud written"
    );
    Ok(())
}

pub fn run_topic_clouds_command(config: &PipelineConfig) -> Result<()> {
    let Some(model) = load_model(config)? else {
        return Ok(());
    };
    let cloud = WordCloud {
        max_words: config.topic_words,
        ..WordCloud::default()
    };

    for topic in model.show_topics(config.topic_words) {
        let path = config.topic_cloud_path(topic.topic);
        if topic.terms.is_empty() {
            warn!(topic = topic.topic, "topic has no terms; skipping cloud");
            continue;
        }
        let layout = cloud
            .write_svg(&topic.terms, &path, config.directory_policy)
            .with_context(|| format!("Failed to draw '{}'", path.display()))?;
        info!(
            topic = topic.topic,
            placed = layout.placements.len(),
            path = %path.display(),
            "topic cloud written"
        );
    }
    Ok(())
}

pub fn run_browse_command(config: &PipelineConfig) -> Result<()> {
    let Some(model) = load_model(config)? else {
        return Ok(());
    };
    let options = BrowserOptions {
        relevant_terms: config.relevant_terms,
        lambda: config.lambda,
        title: format!("Topics for \"{}\"", config.term),
    };
    let path = config.browser_path();
    write_browser(&model, &options, &path, config.directory_policy)
        .with_context(|| format!("Failed to write topic browser '{}'", path.display()))?;
    Ok(())
}

/// Loads the trained model, or `None` when training produced none.
fn load_model(config: &PipelineConfig) -> Result<Option<TopicModel>> {
    let path = config.model_path();
    if !path.exists() {
        warn!(
            path = %path.display(),
            "no topic model found (run `litopics train` first); skipping"
        );
        return Ok(None);
    }
    let model = TopicModel::load(&path)
        .with_context(|| format!("Failed to load model '{}'", path.display()))?;
    Ok(Some(model))
}
