//! `run`: every stage in order.

use anyhow::Result;
use tracing::info;

use super::{
    run_browse_command, run_fetch_command, run_preprocess_command, run_topic_clouds_command,
    run_train_command, run_wordcloud_command,
};
use crate::app_config::PipelineConfig;

pub async fn run_pipeline_command(
    config: &PipelineConfig,
    skip_fetch: bool,
    show_progress: bool,
) -> Result<()> {
    if skip_fetch {
        info!(path = %config.dataset_path().display(), "using existing dataset");
    } else {
        run_fetch_command(config, show_progress).await?;
    }
    run_preprocess_command(config)?;
    run_train_command(config)?;
    run_wordcloud_command(config)?;
    run_topic_clouds_command(config)?;
    run_browse_command(config)?;
    info!(data_dir = %config.data_dir.display(), "pipeline complete");
    Ok(())
}
