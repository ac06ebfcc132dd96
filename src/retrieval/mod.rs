//! Article retrieval from PubMed.
//!
//! Retrieval runs once per publication year: an `esearch` bounded to the
//! calendar year yields identifiers, an `efetch` returns MEDLINE text for them,
//! and the parsed records are projected into an [`ArticleTable`].
//!
//! Network access goes through the [`BibliographicSource`] trait so that
//! year collection and the retry policy can be exercised without a server.

mod dataset;
mod entrez;
mod error;
mod http_client;
mod medline;
mod retry;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

pub use dataset::{
    ABSTRACT_COLUMN, Article, ArticleTable, FIELDS, MULTI_VALUE_SEPARATOR, read_column,
};
pub use entrez::{
    API_KEY_MIN_INTERVAL, DEFAULT_BASE_URL, DEFAULT_FETCH_BATCH_SIZE, DEFAULT_MIN_INTERVAL,
    DEFAULT_PAGE_SIZE, EntrezClient, EntrezConfig,
};
pub use error::{DatasetError, RetrievalError};
pub use http_client::{HttpTimeouts, build_http_client};
pub use medline::{MedlineRecord, parse_medline};
pub use retry::{DEFAULT_RETRY_BACKOFF, fetch_with_retry};

/// Default cap on identifiers collected per year.
pub const DEFAULT_MAX_RESULTS: usize = 10_000;

/// One year's search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Search term in PubMed query syntax.
    pub term: String,
    /// Publication year.
    pub year: i32,
    /// Maximum identifiers to collect.
    pub max_results: usize,
}

impl SearchQuery {
    /// Creates a query for `term` published in `year`.
    pub fn new(term: impl Into<String>, year: i32, max_results: usize) -> Self {
        Self {
            term: term.into(),
            year,
            max_results,
        }
    }

    /// Lower date bound, `YYYY/1/1`.
    #[must_use]
    pub fn mindate(&self) -> String {
        format!("{}/1/1", self.year)
    }

    /// Upper date bound, `YYYY/12/31`.
    #[must_use]
    pub fn maxdate(&self) -> String {
        format!("{}/12/31", self.year)
    }

    /// Checks that the query can produce a request.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidQuery`] for a blank term, a zero cap,
    /// or a year outside `1..=9999`.
    pub fn validate(&self) -> Result<(), RetrievalError> {
        if self.term.trim().is_empty() {
            return Err(RetrievalError::invalid_query("search term is empty"));
        }
        if self.max_results == 0 {
            return Err(RetrievalError::invalid_query("max_results must be at least 1"));
        }
        if !(1..=9999).contains(&self.year) {
            return Err(RetrievalError::invalid_query(format!(
                "year {} is out of range",
                self.year
            )));
        }
        Ok(())
    }
}

/// Identifiers returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Total matches reported by the service (may exceed `ids.len()`).
    pub total_count: usize,
    /// Collected identifiers, in service order.
    pub ids: Vec<String>,
}

/// A service that can search for and fetch bibliographic records.
///
/// Uses `async_trait` so callers can hold `&dyn BibliographicSource`.
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    /// Runs a search and returns matching identifiers.
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, RetrievalError>;

    /// Fetches full records for `ids`.
    async fn fetch(&self, ids: &[String]) -> Result<Vec<MedlineRecord>, RetrievalError>;
}

/// A multi-year retrieval run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalPlan {
    /// Search term.
    pub term: String,
    /// First publication year, inclusive.
    pub first_year: i32,
    /// Last publication year, inclusive.
    pub last_year: i32,
    /// Identifier cap per year.
    pub max_results: usize,
    /// Wait before the single fetch retry.
    pub retry_backoff: Duration,
}

impl RetrievalPlan {
    /// Per-year queries in ascending year order.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidQuery`] when the year range is inverted
    /// or any query fails validation.
    pub fn queries(&self) -> Result<Vec<SearchQuery>, RetrievalError> {
        if self.first_year > self.last_year {
            return Err(RetrievalError::invalid_query(format!(
                "first year {} is after last year {}",
                self.first_year, self.last_year
            )));
        }
        (self.first_year..=self.last_year)
            .map(|year| {
                let query = SearchQuery::new(self.term.clone(), year, self.max_results);
                query.validate()?;
                Ok(query)
            })
            .collect()
    }
}

/// Searches and fetches one year's records.
///
/// A year without matches is logged and yields no records.
///
/// # Errors
///
/// Propagates search failures and fetch failures that survive the retry.
#[instrument(skip(source), fields(year = query.year))]
pub async fn collect_year<S>(
    source: &S,
    query: &SearchQuery,
    retry_backoff: Duration,
) -> Result<Vec<MedlineRecord>, RetrievalError>
where
    S: BibliographicSource + ?Sized,
{
    let outcome = source.search(query).await?;
    if outcome.ids.is_empty() {
        warn!(year = query.year, "no articles found");
        return Ok(Vec::new());
    }
    let records = fetch_with_retry(source, &outcome.ids, retry_backoff).await?;
    info!(
        year = query.year,
        total = outcome.total_count,
        collected = outcome.ids.len(),
        records = records.len(),
        "year collected"
    );
    Ok(records)
}

/// Collects every year of `plan` into one article table.
///
/// # Errors
///
/// Returns [`RetrievalError::InvalidQuery`] for an invalid plan, or the first
/// year's failure.
#[instrument(skip(source), fields(term = %plan.term))]
pub async fn collect_articles<S>(
    source: &S,
    plan: &RetrievalPlan,
) -> Result<ArticleTable, RetrievalError>
where
    S: BibliographicSource + ?Sized,
{
    let mut table = ArticleTable::new();
    for query in plan.queries()? {
        let records = collect_year(source, &query, plan.retry_backoff).await?;
        table.extend_from_records(&records);
    }
    info!(
        articles = table.len(),
        dropped = table.dropped(),
        "retrieval complete"
    );
    Ok(table)
}
