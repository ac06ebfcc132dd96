//! NCBI E-utilities client: `esearch` for identifiers, `efetch` for MEDLINE text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};
use url::Url;

use super::http_client::{HttpTimeouts, build_http_client};
use super::medline::{MedlineRecord, parse_medline};
use super::{BibliographicSource, RetrievalError, SearchOutcome, SearchQuery};
use crate::user_agent::default_user_agent;

/// Public E-utilities endpoint.
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Largest `retmax` the service honors for one esearch page.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Identifiers per efetch request.
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 200;

/// Minimum spacing between requests without an API key (three per second).
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(340);

/// Minimum spacing between requests with an API key (ten per second).
pub const API_KEY_MIN_INTERVAL: Duration = Duration::from_millis(100);

const DATABASE: &str = "pubmed";
const DEFAULT_TOOL: &str = "litopics";

/// Contact details sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrezConfig {
    /// Contact email NCBI may use to reach the operator.
    pub email: String,
    /// Registered tool name.
    pub tool: String,
    /// Optional API key raising the rate limit.
    pub api_key: Option<String>,
}

impl EntrezConfig {
    /// Creates a configuration with the default tool name and no API key.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            tool: DEFAULT_TOOL.to_string(),
            api_key: None,
        }
    }

    fn min_interval(&self) -> Duration {
        if self.api_key.is_some() {
            API_KEY_MIN_INTERVAL
        } else {
            DEFAULT_MIN_INTERVAL
        }
    }
}

#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

/// E-utilities client implementing [`BibliographicSource`].
#[derive(Debug)]
pub struct EntrezClient {
    client: Client,
    base_url: Url,
    config: EntrezConfig,
    page_size: usize,
    batch_size: usize,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl EntrezClient {
    /// Creates a client for the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(config: EntrezConfig) -> Result<Self, RetrievalError> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Creates a client for a custom endpoint (mirrors, mock servers).
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidUrl`] for an unparsable base URL, or
    /// [`RetrievalError::ClientBuild`] when the HTTP client cannot be built.
    pub fn with_base_url(config: EntrezConfig, base_url: &str) -> Result<Self, RetrievalError> {
        let trimmed = base_url.trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/")).map_err(|_| {
            RetrievalError::InvalidUrl {
                url: base_url.to_string(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RetrievalError::InvalidUrl {
                url: base_url.to_string(),
            });
        }
        let client = build_http_client(&default_user_agent(), HttpTimeouts::default())?;
        let min_interval = config.min_interval();
        Ok(Self {
            client,
            base_url,
            config,
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_FETCH_BATCH_SIZE,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Sets the esearch page size (clamped to at least one).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the efetch batch size (clamped to at least one).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Overrides the minimum spacing between requests.
    #[must_use]
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, utility: &str) -> Result<Url, RetrievalError> {
        let mut url = self
            .base_url
            .join(utility)
            .map_err(|_| RetrievalError::InvalidUrl {
                url: format!("{}{utility}", self.base_url),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("db", DATABASE);
            pairs.append_pair("tool", &self.config.tool);
            pairs.append_pair("email", &self.config.email);
            if let Some(key) = &self.config.api_key {
                pairs.append_pair("api_key", key);
            }
        }
        Ok(url)
    }

    fn esearch_url(
        &self,
        query: &SearchQuery,
        retstart: usize,
        retmax: usize,
    ) -> Result<Url, RetrievalError> {
        let mut url = self.endpoint("esearch.fcgi")?;
        url.query_pairs_mut()
            .append_pair("term", &query.term)
            .append_pair("datetype", "pdat")
            .append_pair("mindate", &query.mindate())
            .append_pair("maxdate", &query.maxdate())
            .append_pair("sort", "pub_date")
            .append_pair("retmode", "json")
            .append_pair("retstart", &retstart.to_string())
            .append_pair("retmax", &retmax.to_string());
        Ok(url)
    }

    fn efetch_url(&self, ids: &[String]) -> Result<Url, RetrievalError> {
        let mut url = self.endpoint("efetch.fcgi")?;
        url.query_pairs_mut()
            .append_pair("id", &ids.join(","))
            .append_pair("rettype", "medline")
            .append_pair("retmode", "text");
        Ok(url)
    }

    /// Waits until the configured interval since the previous request has passed.
    async fn pace(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis(), "pacing E-utilities request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_text(&self, url: Url) -> Result<String, RetrievalError> {
        let shown = display_url(&url);
        self.pace().await;
        debug!(url = %shown, "E-utilities request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RetrievalError::network(shown.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::http_status(shown, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| RetrievalError::incomplete_read(shown, e.to_string()))
    }

    async fn search_page(
        &self,
        query: &SearchQuery,
        retstart: usize,
        retmax: usize,
    ) -> Result<(usize, Vec<String>), RetrievalError> {
        let url = self.esearch_url(query, retstart, retmax)?;
        let shown = display_url(&url);
        let body = self.get_text(url).await?;

        let envelope: EsearchEnvelope = serde_json::from_str(&body)
            .map_err(|e| RetrievalError::invalid_response(&shown, e.to_string()))?;
        let result = envelope.esearchresult;
        if let Some(error) = result.error {
            return Err(RetrievalError::invalid_response(shown, error));
        }
        let count = result
            .count
            .as_deref()
            .unwrap_or("0")
            .parse::<usize>()
            .map_err(|e| RetrievalError::invalid_response(&shown, format!("bad count: {e}")))?;
        Ok((count, result.idlist))
    }
}

#[async_trait]
impl BibliographicSource for EntrezClient {
    #[instrument(skip(self), fields(year = query.year, term = %query.term))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, RetrievalError> {
        query.validate()?;

        let mut ids: Vec<String> = Vec::new();
        let mut total_count = 0;
        let mut retstart = 0;
        loop {
            let retmax = (query.max_results - ids.len()).min(self.page_size);
            let (count, page) = self.search_page(query, retstart, retmax).await?;
            total_count = count;
            let page_len = page.len();
            ids.extend(page);
            retstart += page_len;
            debug!(page_len, collected = ids.len(), total_count, "esearch page");

            if page_len == 0 || ids.len() >= query.max_results || retstart >= total_count {
                break;
            }
        }
        ids.truncate(query.max_results);
        Ok(SearchOutcome { total_count, ids })
    }

    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    async fn fetch(&self, ids: &[String]) -> Result<Vec<MedlineRecord>, RetrievalError> {
        let mut records = Vec::with_capacity(ids.len());
        for batch in ids.chunks(self.batch_size) {
            let url = self.efetch_url(batch)?;
            let body = self.get_text(url).await?;
            let parsed = parse_medline(&body);
            debug!(requested = batch.len(), parsed = parsed.len(), "efetch batch");
            records.extend(parsed);
        }
        Ok(records)
    }
}

/// URL without its query string, so contact details and keys stay out of errors and logs.
fn display_url(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
