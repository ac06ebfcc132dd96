//! Pipeline configuration and config file loading.
//!
//! [`PipelineConfig`] gathers every point of variation of the pipeline. Values
//! come from built-in defaults, then an optional config file, then command-line
//! flags. The file holds `key = value` lines with `#` comments and
//! double-quoted strings.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

use litopics_core::corpus::{DEFAULT_MAX_DF_FRACTION, DEFAULT_MIN_DF, PruneThresholds};
use litopics_core::model::LdaParams;
use litopics_core::retrieval::{
    DEFAULT_BASE_URL, DEFAULT_FETCH_BATCH_SIZE, DEFAULT_MAX_RESULTS, DEFAULT_PAGE_SIZE,
    DEFAULT_RETRY_BACKOFF, EntrezConfig, RetrievalPlan,
};
use litopics_core::viz::{
    DEFAULT_COMMON_WORDS, DEFAULT_LAMBDA, DEFAULT_RELEVANT_TERMS, DEFAULT_TOPIC_WORDS,
};
use litopics_core::{DirectoryPolicy, NonStringPolicy};

/// Default search term.
pub const DEFAULT_TERM: &str = "artificial intelligence";

/// Default first publication year.
pub const DEFAULT_FIRST_YEAR: i32 = 1990;

/// Default last publication year.
pub const DEFAULT_LAST_YEAR: i32 = 2021;

/// Default directory for every artifact.
pub const DEFAULT_DATA_DIR: &str = "data";

const APP_DIR: &str = "litopics";

/// Effective settings for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Contact email sent to E-utilities; required for retrieval.
    pub email: Option<String>,
    /// Registered tool name.
    pub tool: String,
    /// Optional E-utilities API key.
    pub api_key: Option<String>,
    /// E-utilities base URL.
    pub base_url: String,
    /// Search term.
    pub term: String,
    /// First publication year, inclusive.
    pub first_year: i32,
    /// Last publication year, inclusive.
    pub last_year: i32,
    /// Identifier cap per year.
    pub max_results: usize,
    /// esearch page size.
    pub page_size: usize,
    /// Identifiers per efetch request.
    pub fetch_batch_size: usize,
    /// Wait before the single fetch retry.
    pub retry_backoff: Duration,
    /// Minimum spacing between requests; `None` derives it from the API key.
    pub request_interval: Option<Duration>,
    /// Directory holding every artifact.
    pub data_dir: PathBuf,
    /// Vocabulary pruning.
    pub thresholds: PruneThresholds,
    /// Topic model training.
    pub lda: LdaParams,
    /// Words in the corpus-wide cloud.
    pub common_words: usize,
    /// Words per topic cloud.
    pub topic_words: usize,
    /// Terms per topic in the browser.
    pub relevant_terms: usize,
    /// Initial browser relevance slider.
    pub lambda: f64,
    /// Handling of missing abstracts.
    pub non_string_policy: NonStringPolicy,
    /// Handling of missing output directories.
    pub directory_policy: DirectoryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            email: None,
            tool: APP_DIR.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            term: DEFAULT_TERM.to_string(),
            first_year: DEFAULT_FIRST_YEAR,
            last_year: DEFAULT_LAST_YEAR,
            max_results: DEFAULT_MAX_RESULTS,
            page_size: DEFAULT_PAGE_SIZE,
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            request_interval: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            thresholds: PruneThresholds::new(DEFAULT_MIN_DF, DEFAULT_MAX_DF_FRACTION),
            lda: LdaParams::default(),
            common_words: DEFAULT_COMMON_WORDS,
            topic_words: DEFAULT_TOPIC_WORDS,
            relevant_terms: DEFAULT_RELEVANT_TERMS,
            lambda: DEFAULT_LAMBDA,
            non_string_policy: NonStringPolicy::default(),
            directory_policy: DirectoryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Checks cross-field constraints after all sources are merged.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.first_year > self.last_year {
            bail!(
                "first_year ({}) must not be after last_year ({})",
                self.first_year,
                self.last_year
            );
        }
        self.thresholds
            .validate()
            .context("Invalid pruning thresholds")?;
        self.lda.validate().context("Invalid LDA parameters")?;
        if !(0.0..=1.0).contains(&self.lambda) {
            bail!("lambda must be within [0, 1], got {}", self.lambda);
        }
        Ok(())
    }

    /// Contact details for E-utilities.
    ///
    /// # Errors
    ///
    /// Returns an error when no email is configured.
    pub fn entrez_config(&self) -> Result<EntrezConfig> {
        let email = self
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("An email address is required for PubMed requests (use --email or `email` in the config file)")
            })?;
        Ok(EntrezConfig {
            email,
            tool: self.tool.clone(),
            api_key: self.api_key.clone(),
        })
    }

    /// The retrieval run described by this configuration.
    #[must_use]
    pub fn retrieval_plan(&self) -> RetrievalPlan {
        RetrievalPlan {
            term: self.term.clone(),
            first_year: self.first_year,
            last_year: self.last_year,
            max_results: self.max_results,
            retry_backoff: self.retry_backoff,
        }
    }

    /// `data/data.csv`.
    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join("data.csv")
    }

    /// `data/lemmas.json`.
    #[must_use]
    pub fn lemmas_path(&self) -> PathBuf {
        self.data_dir.join("lemmas.json")
    }

    /// `data/model`.
    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("model")
    }

    /// `data/model/dictionary.json`.
    #[must_use]
    pub fn dictionary_path(&self) -> PathBuf {
        self.model_dir().join("dictionary.json")
    }

    /// `data/model/corpus.mm`.
    #[must_use]
    pub fn corpus_path(&self) -> PathBuf {
        self.model_dir().join("corpus.mm")
    }

    /// `data/model/abstracts.model.json`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.model_dir().join("abstracts.model.json")
    }

    /// `data/common_words.svg`.
    #[must_use]
    pub fn common_words_path(&self) -> PathBuf {
        self.data_dir.join("common_words.svg")
    }

    /// `data/topic_<i>.svg`.
    #[must_use]
    pub fn topic_cloud_path(&self, topic: usize) -> PathBuf {
        self.data_dir.join(format!("topic_{topic}.svg"))
    }

    /// `data/ldamodel_viz.html`.
    #[must_use]
    pub fn browser_path(&self) -> PathBuf {
        self.data_dir.join("ldamodel_viz.html")
    }
}

/// Values read from a config file; `None` leaves the default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Contact email.
    pub email: Option<String>,
    /// Tool name.
    pub tool: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// E-utilities base URL.
    pub base_url: Option<String>,
    /// Search term.
    pub term: Option<String>,
    /// First year.
    pub first_year: Option<i32>,
    /// Last year.
    pub last_year: Option<i32>,
    /// Identifier cap per year.
    pub max_results: Option<usize>,
    /// esearch page size.
    pub page_size: Option<usize>,
    /// efetch batch size.
    pub fetch_batch_size: Option<usize>,
    /// Retry back-off in seconds.
    pub retry_backoff_secs: Option<u64>,
    /// Request spacing in milliseconds.
    pub request_interval_ms: Option<u64>,
    /// Artifact directory.
    pub data_dir: Option<PathBuf>,
    /// Minimum document frequency.
    pub min_df: Option<usize>,
    /// Maximum document fraction.
    pub max_df_fraction: Option<f64>,
    /// Vocabulary cap.
    pub keep_n: Option<usize>,
    /// Number of topics.
    pub num_topics: Option<usize>,
    /// Gibbs sweeps.
    pub iterations: Option<usize>,
    /// Document-topic prior.
    pub alpha: Option<f64>,
    /// Topic-term prior.
    pub eta: Option<f64>,
    /// Sampler seed.
    pub seed: Option<u64>,
    /// Words in the corpus-wide cloud.
    pub common_words: Option<usize>,
    /// Words per topic cloud.
    pub topic_words: Option<usize>,
    /// Browser terms per topic.
    pub relevant_terms: Option<usize>,
    /// Browser slider start.
    pub lambda: Option<f64>,
    /// Missing abstract handling.
    pub non_string_policy: Option<NonStringPolicy>,
    /// Missing directory handling.
    pub directory_policy: Option<DirectoryPolicy>,
}

impl FileConfig {
    /// Validates single-field ranges.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending key.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [("first_year", self.first_year), ("last_year", self.last_year)] {
            if let Some(year) = value
                && !(1800..=2100).contains(&year)
            {
                bail!("Invalid config value for `{key}`: {year}. Expected range: 1800..=2100");
            }
        }
        if let (Some(first), Some(last)) = (self.first_year, self.last_year)
            && first > last
        {
            bail!("Invalid config values: `first_year` ({first}) is after `last_year` ({last})");
        }
        validate_count("max_results", self.max_results, 1, 100_000)?;
        validate_count("page_size", self.page_size, 1, DEFAULT_PAGE_SIZE)?;
        validate_count("fetch_batch_size", self.fetch_batch_size, 1, 10_000)?;
        validate_count("keep_n", self.keep_n, 1, usize::MAX)?;
        validate_count("num_topics", self.num_topics, 1, 1_000)?;
        validate_count("iterations", self.iterations, 1, 1_000_000)?;
        validate_count("common_words", self.common_words, 1, 1_000)?;
        validate_count("topic_words", self.topic_words, 1, 1_000)?;
        validate_count("relevant_terms", self.relevant_terms, 1, 1_000)?;
        if let Some(secs) = self.retry_backoff_secs
            && secs > 3600
        {
            bail!("Invalid config value for `retry_backoff_secs`: {secs}. Expected range: 0..=3600");
        }
        if let Some(ms) = self.request_interval_ms
            && ms > 60_000
        {
            bail!("Invalid config value for `request_interval_ms`: {ms}. Expected range: 0..=60000");
        }
        validate_unit_interval("max_df_fraction", self.max_df_fraction)?;
        validate_unit_interval("lambda", self.lambda)?;
        for (key, value) in [("alpha", self.alpha), ("eta", self.eta)] {
            if let Some(prior) = value
                && (!prior.is_finite() || prior <= 0.0)
            {
                bail!("Invalid config value for `{key}`: {prior}. Expected a positive number");
            }
        }
        Ok(())
    }

    /// Overlays the values present in this file onto `config`.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(v) = &self.email {
            config.email = Some(v.clone());
        }
        if let Some(v) = &self.tool {
            config.tool.clone_from(v);
        }
        if let Some(v) = &self.api_key {
            config.api_key = Some(v.clone());
        }
        if let Some(v) = &self.base_url {
            config.base_url.clone_from(v);
        }
        if let Some(v) = &self.term {
            config.term.clone_from(v);
        }
        if let Some(v) = self.first_year {
            config.first_year = v;
        }
        if let Some(v) = self.last_year {
            config.last_year = v;
        }
        if let Some(v) = self.max_results {
            config.max_results = v;
        }
        if let Some(v) = self.page_size {
            config.page_size = v;
        }
        if let Some(v) = self.fetch_batch_size {
            config.fetch_batch_size = v;
        }
        if let Some(v) = self.retry_backoff_secs {
            config.retry_backoff = Duration::from_secs(v);
        }
        if let Some(v) = self.request_interval_ms {
            config.request_interval = Some(Duration::from_millis(v));
        }
        if let Some(v) = &self.data_dir {
            config.data_dir.clone_from(v);
        }
        if let Some(v) = self.min_df {
            config.thresholds.min_df = v;
        }
        if let Some(v) = self.max_df_fraction {
            config.thresholds.max_df_fraction = v;
        }
        if let Some(v) = self.keep_n {
            config.thresholds.keep_n = Some(v);
        }
        if let Some(v) = self.num_topics {
            // Priors follow K unless set explicitly below.
            let seed = config.lda.seed;
            let iterations = config.lda.iterations;
            config.lda = LdaParams::new(v).with_seed(seed).with_iterations(iterations);
        }
        if let Some(v) = self.iterations {
            config.lda.iterations = v;
        }
        if let Some(v) = self.alpha {
            config.lda.alpha = v;
        }
        if let Some(v) = self.eta {
            config.lda.eta = v;
        }
        if let Some(v) = self.seed {
            config.lda.seed = v;
        }
        if let Some(v) = self.common_words {
            config.common_words = v;
        }
        if let Some(v) = self.topic_words {
            config.topic_words = v;
        }
        if let Some(v) = self.relevant_terms {
            config.relevant_terms = v;
        }
        if let Some(v) = self.lambda {
            config.lambda = v;
        }
        if let Some(v) = self.non_string_policy {
            config.non_string_policy = v;
        }
        if let Some(v) = self.directory_policy {
            config.directory_policy = v;
        }
    }
}

fn validate_count(key: &str, value: Option<usize>, min: usize, max: usize) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        if max == usize::MAX {
            bail!("Invalid config value for `{key}`: {value}. Expected at least {min}");
        }
        bail!("Invalid config value for `{key}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

fn validate_unit_interval(key: &str, value: Option<f64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(0.0..=1.0).contains(&value) {
        bail!("Invalid config value for `{key}`: {value}. Expected range: 0.0..=1.0");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/litopics/config.toml`
/// 2. `$HOME/.config/litopics/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config at `explicit`, or the default path when present.
///
/// An explicit path must exist; a missing default file is not an error.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_config_file(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(read_config_file(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parses config file text.
///
/// # Errors
///
/// Returns an error naming the line of the first syntax error, unknown key or
/// out-of-range value.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "email" => cfg.email = Some(parse_string_literal(value).with_context(context)?),
            "tool" => cfg.tool = Some(parse_string_literal(value).with_context(context)?),
            "api_key" => cfg.api_key = Some(parse_string_literal(value).with_context(context)?),
            "base_url" => cfg.base_url = Some(parse_string_literal(value).with_context(context)?),
            "term" => cfg.term = Some(parse_string_literal(value).with_context(context)?),
            "data_dir" => {
                cfg.data_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "first_year" => cfg.first_year = Some(parse_year(value).with_context(context)?),
            "last_year" => cfg.last_year = Some(parse_year(value).with_context(context)?),
            "max_results" => cfg.max_results = Some(parse_usize(value).with_context(context)?),
            "page_size" => cfg.page_size = Some(parse_usize(value).with_context(context)?),
            "fetch_batch_size" => {
                cfg.fetch_batch_size = Some(parse_usize(value).with_context(context)?);
            }
            "retry_backoff_secs" => {
                cfg.retry_backoff_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "request_interval_ms" => {
                cfg.request_interval_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "min_df" => cfg.min_df = Some(parse_usize(value).with_context(context)?),
            "max_df_fraction" => {
                cfg.max_df_fraction = Some(parse_float(value).with_context(context)?);
            }
            "keep_n" => cfg.keep_n = Some(parse_usize(value).with_context(context)?),
            "num_topics" => cfg.num_topics = Some(parse_usize(value).with_context(context)?),
            "iterations" => cfg.iterations = Some(parse_usize(value).with_context(context)?),
            "alpha" => cfg.alpha = Some(parse_float(value).with_context(context)?),
            "eta" => cfg.eta = Some(parse_float(value).with_context(context)?),
            "seed" => cfg.seed = Some(parse_integer_u64(value).with_context(context)?),
            "common_words" => cfg.common_words = Some(parse_usize(value).with_context(context)?),
            "topic_words" => cfg.topic_words = Some(parse_usize(value).with_context(context)?),
            "relevant_terms" => {
                cfg.relevant_terms = Some(parse_usize(value).with_context(context)?);
            }
            "lambda" => cfg.lambda = Some(parse_float(value).with_context(context)?),
            "non_string_policy" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.non_string_policy = Some(
                    NonStringPolicy::parse(&parsed)
                        .ok_or_else(|| anyhow!("Expected one of: skip, reject"))
                        .with_context(context)?,
                );
            }
            "directory_policy" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.directory_policy = Some(
                    DirectoryPolicy::parse(&parsed)
                        .ok_or_else(|| anyhow!("Expected one of: create, require-existing"))
                        .with_context(context)?,
                );
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow!("Integer value out of range for u64"))
}

fn parse_usize(raw_value: &str) -> Result<usize> {
    let value = parse_integer_u64(raw_value)?;
    usize::try_from(value).map_err(|_| anyhow!("Integer value out of range for usize"))
}

fn parse_year(raw_value: &str) -> Result<i32> {
    let value = parse_integer_u64(raw_value)?;
    i32::try_from(value).map_err(|_| anyhow!("Year out of range"))
}

fn parse_float(raw_value: &str) -> Result<f64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected numeric value");
    }
    let value = token.parse::<f64>()?;
    if !value.is_finite() {
        bail!("Expected a finite number");
    }
    Ok(value)
}
