//! `fetch`: search PubMed year by year and write the article dataset.

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use litopics_core::retrieval::{ArticleTable, EntrezClient, collect_year};
use tracing::{info, warn};

use crate::app_config::PipelineConfig;

pub async fn run_fetch_command(config: &PipelineConfig, show_progress: bool) -> Result<()> {
    let entrez = config.entrez_config()?;
    let mut client = EntrezClient::with_base_url(entrez, &config.base_url)
        .context("Failed to create the E-utilities client")?
        .with_page_size(config.page_size)
        .with_batch_size(config.fetch_batch_size);
    if let Some(interval) = config.request_interval {
        client = client.with_min_interval(interval);
    }

    let plan = config.retrieval_plan();
    let queries = plan.queries().context("Invalid retrieval range")?;
    info!(
        term = %plan.term,
        first_year = plan.first_year,
        last_year = plan.last_year,
        endpoint = %client.base_url(),
        "fetching articles"
    );

    let progress = year_progress(show_progress, queries.len());
    let mut table = ArticleTable::new();
    for query in &queries {
        progress.set_message(format!("{} ({} articles so far)", query.year, table.len()));
        let records = collect_year(&client, query, plan.retry_backoff)
            .await
            .with_context(|| format!("Failed to collect articles for {}", query.year))?;
        table.extend_from_records(&records);
        progress.inc(1);
    }
    progress.finish_and_clear();

    if table.is_empty() {
        warn!("no articles with all fields were collected");
    }
    let path = config.dataset_path();
    table
        .write_csv(&path, config.directory_policy)
        .with_context(|| format!("Failed to write dataset '{}'", path.display()))?;
    info!(
        articles = table.len(),
        dropped = table.dropped(),
        path = %path.display(),
        "dataset written"
    );
    Ok(())
}

fn year_progress(show: bool, years: usize) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(u64::try_from(years).unwrap_or(u64::MAX));
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
