//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use litopics_core::{DirectoryPolicy, NonStringPolicy};

use crate::app_config::FileConfig;

/// Topic models of PubMed literature.
///
/// Litopics fetches abstracts for a search term year by year, lemmatizes them,
/// fits a topic model and renders word clouds and a topic browser.
#[derive(Parser, Debug)]
#[command(name = "litopics")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to load instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding every pipeline artifact (default: data)
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Whether missing output directories are created (create|require-existing)
    #[arg(long, value_name = "POLICY", value_parser = parse_directory_policy, global = true)]
    pub directory_policy: Option<DirectoryPolicy>,

    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline stages.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search PubMed year by year and write data.csv
    Fetch(FetchArgs),

    /// Lemmatize the abstracts in data.csv into lemmas.json
    Preprocess(PreprocessArgs),

    /// Build the pruned corpus and fit the topic model
    Train(TrainArgs),

    /// Draw the most common lemmas as a word cloud
    #[command(name = "wordcloud")]
    Wordcloud(WordcloudArgs),

    /// Draw one word cloud per topic
    #[command(name = "topic-clouds")]
    TopicClouds(TopicCloudsArgs),

    /// Write the interactive topic browser page
    Browse(BrowseArgs),

    /// Run every stage in order
    Run(RunArgs),
}

/// Options for `fetch`.
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Contact email sent with every E-utilities request
    #[arg(long)]
    pub email: Option<String>,

    /// NCBI API key (raises the request rate limit)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Search term
    #[arg(long)]
    pub term: Option<String>,

    /// First publication year, inclusive
    #[arg(long, value_parser = clap::value_parser!(i32).range(1800..=2100))]
    pub first_year: Option<i32>,

    /// Last publication year, inclusive
    #[arg(long, value_parser = clap::value_parser!(i32).range(1800..=2100))]
    pub last_year: Option<i32>,

    /// Maximum identifiers collected per year (1-100000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=100_000))]
    pub max_results: Option<u64>,

    /// E-utilities base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Seconds to wait before retrying an interrupted fetch (max 3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub retry_backoff_secs: Option<u64>,

    /// Minimum delay between requests in milliseconds (max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60_000))]
    pub request_interval_ms: Option<u64>,
}

/// Options for `preprocess`.
#[derive(Args, Debug, Clone, Default)]
pub struct PreprocessArgs {
    /// What to do with rows whose abstract is missing (skip|reject)
    #[arg(long, value_name = "POLICY", value_parser = parse_non_string_policy)]
    pub non_string_policy: Option<NonStringPolicy>,
}

/// Options for `train`.
#[derive(Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// Number of topics (1-1000)
    #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub num_topics: Option<u64>,

    /// Gibbs sampling sweeps
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1_000_000))]
    pub iterations: Option<u64>,

    /// Sampler seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Drop terms found in fewer documents than this
    #[arg(long)]
    pub min_df: Option<usize>,

    /// Drop terms found in more than this fraction of documents (0.0-1.0)
    #[arg(long, value_parser = parse_unit_interval)]
    pub max_df_fraction: Option<f64>,

    /// Keep only this many of the most frequent terms after pruning
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub keep_n: Option<u64>,
}

/// Options for `wordcloud`.
#[derive(Args, Debug, Clone, Default)]
pub struct WordcloudArgs {
    /// Number of words drawn (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub words: Option<u64>,
}

/// Options for `topic-clouds`.
#[derive(Args, Debug, Clone, Default)]
pub struct TopicCloudsArgs {
    /// Number of words drawn per topic (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub words: Option<u64>,
}

/// Options for `browse`.
#[derive(Args, Debug, Clone, Default)]
pub struct BrowseArgs {
    /// Terms listed per topic (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub relevant_terms: Option<u64>,

    /// Initial relevance weight between probability and lift (0.0-1.0)
    #[arg(long, value_parser = parse_unit_interval)]
    pub lambda: Option<f64>,
}

/// Options for `run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Start from an existing data.csv instead of fetching
    #[arg(long)]
    pub skip_fetch: bool,

    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(flatten)]
    pub preprocess: PreprocessArgs,

    #[command(flatten)]
    pub train: TrainArgs,

    /// Words in the corpus-wide cloud (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub common_words: Option<u64>,

    /// Words per topic cloud (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub topic_words: Option<u64>,

    #[command(flatten)]
    pub browse: BrowseArgs,
}

impl Cli {
    /// Flag values as a config layer applied over the file config.
    pub fn overrides(&self) -> FileConfig {
        let mut layer = FileConfig {
            data_dir: self.data_dir.clone(),
            directory_policy: self.directory_policy,
            ..FileConfig::default()
        };
        match &self.command {
            Command::Fetch(args) => args.apply(&mut layer),
            Command::Preprocess(args) => args.apply(&mut layer),
            Command::Train(args) => args.apply(&mut layer),
            Command::Wordcloud(args) => layer.common_words = args.words.map(to_usize),
            Command::TopicClouds(args) => layer.topic_words = args.words.map(to_usize),
            Command::Browse(args) => args.apply(&mut layer),
            Command::Run(args) => {
                args.fetch.apply(&mut layer);
                args.preprocess.apply(&mut layer);
                args.train.apply(&mut layer);
                args.browse.apply(&mut layer);
                layer.common_words = args.common_words.map(to_usize);
                layer.topic_words = args.topic_words.map(to_usize);
            }
        }
        layer
    }
}

impl FetchArgs {
    fn apply(&self, layer: &mut FileConfig) {
        layer.email.clone_from(&self.email);
        layer.api_key.clone_from(&self.api_key);
        layer.term.clone_from(&self.term);
        layer.first_year = self.first_year;
        layer.last_year = self.last_year;
        layer.max_results = self.max_results.map(to_usize);
        layer.base_url.clone_from(&self.base_url);
        layer.retry_backoff_secs = self.retry_backoff_secs;
        layer.request_interval_ms = self.request_interval_ms;
    }
}

impl PreprocessArgs {
    fn apply(&self, layer: &mut FileConfig) {
        layer.non_string_policy = self.non_string_policy;
    }
}

impl TrainArgs {
    fn apply(&self, layer: &mut FileConfig) {
        layer.num_topics = self.num_topics.map(to_usize);
        layer.iterations = self.iterations.map(to_usize);
        layer.seed = self.seed;
        layer.min_df = self.min_df;
        layer.max_df_fraction = self.max_df_fraction;
        layer.keep_n = self.keep_n.map(to_usize);
    }
}

impl BrowseArgs {
    fn apply(&self, layer: &mut FileConfig) {
        layer.relevant_terms = self.relevant_terms.map(to_usize);
        layer.lambda = self.lambda;
    }
}

// Values are range-checked by clap; saturate on 32-bit targets.
fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn parse_unit_interval(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{parsed} is outside 0.0..=1.0"))
    }
}

fn parse_non_string_policy(value: &str) -> Result<NonStringPolicy, String> {
    NonStringPolicy::parse(value).ok_or_else(|| format!("expected skip or reject, got '{value}'"))
}

fn parse_directory_policy(value: &str) -> Result<DirectoryPolicy, String> {
    DirectoryPolicy::parse(value)
        .ok_or_else(|| format!("expected create or require-existing, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_a_subcommand() {
        let err = Cli::try_parse_from(["litopics"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["litopics", "-v", "train"]).unwrap();
        assert_eq!(cli.verbose, 1);

        let cli = Cli::try_parse_from(["litopics", "train", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let cli = Cli::try_parse_from(["litopics", "--quiet", "browse"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Cli::try_parse_from(["litopics", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["litopics", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_unknown_subcommand_is_rejected() {
        let err = Cli::try_parse_from(["litopics", "download"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_cli_subcommand_names() {
        for name in [
            "fetch",
            "preprocess",
            "train",
            "wordcloud",
            "topic-clouds",
            "browse",
            "run",
        ] {
            assert!(
                Cli::try_parse_from(["litopics", name]).is_ok(),
                "subcommand {name} should parse"
            );
        }
    }

    #[test]
    fn test_fetch_overrides_fill_layer() {
        let cli = Cli::try_parse_from([
            "litopics",
            "--data-dir",
            "out",
            "fetch",
            "--email",
            "me@example.org",
            "--term",
            "deep learning",
            "--first-year",
            "2019",
            "--last-year",
            "2020",
            "--max-results",
            "50",
        ])
        .unwrap();
        let layer = cli.overrides();
        assert_eq!(layer.email.as_deref(), Some("me@example.org"));
        assert_eq!(layer.term.as_deref(), Some("deep learning"));
        assert_eq!(layer.first_year, Some(2019));
        assert_eq!(layer.last_year, Some(2020));
        assert_eq!(layer.max_results, Some(50));
        assert_eq!(layer.data_dir, Some(PathBuf::from("out")));
        assert_eq!(layer.num_topics, None);
    }

    #[test]
    fn test_year_out_of_range_is_rejected() {
        let err = Cli::try_parse_from(["litopics", "fetch", "--first-year", "1500"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_train_overrides_and_short_topic_flag() {
        let cli = Cli::try_parse_from([
            "litopics",
            "train",
            "-k",
            "5",
            "--min-df",
            "2",
            "--max-df-fraction",
            "0.8",
            "--seed",
            "7",
        ])
        .unwrap();
        let layer = cli.overrides();
        assert_eq!(layer.num_topics, Some(5));
        assert_eq!(layer.min_df, Some(2));
        assert_eq!(layer.max_df_fraction, Some(0.8));
        assert_eq!(layer.seed, Some(7));
    }

    #[test]
    fn test_fraction_flags_reject_out_of_range() {
        let err = Cli::try_parse_from(["litopics", "train", "--max-df-fraction", "1.5"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["litopics", "browse", "--lambda", "x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_policies_parse() {
        let cli = Cli::try_parse_from([
            "litopics",
            "--directory-policy",
            "require-existing",
            "preprocess",
            "--non-string-policy",
            "reject",
        ])
        .unwrap();
        let layer = cli.overrides();
        assert_eq!(layer.directory_policy, Some(DirectoryPolicy::RequireExisting));
        assert_eq!(layer.non_string_policy, Some(NonStringPolicy::Reject));

        let err = Cli::try_parse_from(["litopics", "preprocess", "--non-string-policy", "drop"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_stage_specific_word_counts() {
        let cli = Cli::try_parse_from(["litopics", "wordcloud", "--words", "10"]).unwrap();
        assert_eq!(cli.overrides().common_words, Some(10));

        let cli = Cli::try_parse_from(["litopics", "topic-clouds", "--words", "12"]).unwrap();
        let layer = cli.overrides();
        assert_eq!(layer.topic_words, Some(12));
        assert_eq!(layer.common_words, None);
    }

    #[test]
    fn test_run_collects_every_stage_flag() {
        let cli = Cli::try_parse_from([
            "litopics",
            "run",
            "--skip-fetch",
            "--num-topics",
            "4",
            "--common-words",
            "30",
            "--lambda",
            "0.3",
            "--non-string-policy",
            "skip",
        ])
        .unwrap();
        let Command::Run(args) = &cli.command else {
            panic!("expected run");
        };
        assert!(args.skip_fetch);
        let layer = cli.overrides();
        assert_eq!(layer.num_topics, Some(4));
        assert_eq!(layer.common_words, Some(30));
        assert_eq!(layer.lambda, Some(0.3));
        assert_eq!(layer.non_string_policy, Some(NonStringPolicy::Skip));
    }
}
