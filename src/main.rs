//! CLI entry point for litopics.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::{PipelineConfig, load_file_config};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let config = resolve_config(&cli)?;
    let show_progress = !cli.quiet && io::stderr().is_terminal();

    match &cli.command {
        Command::Fetch(_) => commands::run_fetch_command(&config, show_progress).await?,
        Command::Preprocess(_) => commands::run_preprocess_command(&config)?,
        Command::Train(_) => commands::run_train_command(&config)?,
        Command::Wordcloud(_) => commands::run_wordcloud_command(&config)?,
        Command::TopicClouds(_) => commands::run_topic_clouds_command(&config)?,
        Command::Browse(_) => commands::run_browse_command(&config)?,
        Command::Run(args) => {
            commands::run_pipeline_command(&config, args.skip_fetch, show_progress).await?;
        }
    }

    Ok(())
}

/// Defaults, then the config file, then command-line flags.
fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let loaded = load_file_config(cli.config.as_deref())?;
    let mut config = PipelineConfig::default();
    if let Some(file) = &loaded.config {
        if let Some(path) = &loaded.path {
            info!(path = %path.display(), "loaded config file");
        }
        file.apply_to(&mut config);
    }

    let overrides = cli.overrides();
    overrides
        .validate()
        .context("Invalid command-line options")?;
    overrides.apply_to(&mut config);

    config.validate()?;
    Ok(config)
}
