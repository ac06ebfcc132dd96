//! Single delayed retry for interrupted fetches.
//!
//! Large `efetch` payloads occasionally end mid-body. The service usually
//! recovers within a minute, so an incomplete read is retried exactly once
//! after a fixed back-off. Every other failure, and a second incomplete read,
//! propagates unchanged.

use std::time::Duration;

use tracing::{instrument, warn};

use super::{BibliographicSource, MedlineRecord, RetrievalError};

/// Default wait before the single retry.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Fetches `ids`, retrying once after `backoff` when the first attempt hits an
/// incomplete read.
///
/// # Errors
///
/// Returns the first attempt's error when it is not transient, or the second
/// attempt's error when the retry fails too.
#[instrument(skip(source, ids), fields(ids = ids.len(), backoff_secs = backoff.as_secs()))]
pub async fn fetch_with_retry<S>(
    source: &S,
    ids: &[String],
    backoff: Duration,
) -> Result<Vec<MedlineRecord>, RetrievalError>
where
    S: BibliographicSource + ?Sized,
{
    match source.fetch(ids).await {
        Ok(records) => Ok(records),
        Err(error) if error.is_transient() => {
            warn!(%error, backoff_secs = backoff.as_secs(), "fetch interrupted; retrying once");
            tokio::time::sleep(backoff).await;
            source.fetch(ids).await
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::retrieval::{SearchOutcome, SearchQuery};

    /// Fails the first `failures` fetches with the error built by `make_error`.
    struct ScriptedSource {
        calls: AtomicUsize,
        failures: usize,
        make_error: fn() -> RetrievalError,
    }

    impl ScriptedSource {
        fn new(failures: usize, make_error: fn() -> RetrievalError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                make_error,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BibliographicSource for ScriptedSource {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchOutcome, RetrievalError> {
            Ok(SearchOutcome::default())
        }

        async fn fetch(&self, ids: &[String]) -> Result<Vec<MedlineRecord>, RetrievalError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err((self.make_error)());
            }
            Ok(ids
                .iter()
                .map(|id| {
                    let mut record = MedlineRecord::new();
                    record.push("PMID", id.clone());
                    record
                })
                .collect())
        }
    }

    fn incomplete() -> RetrievalError {
        RetrievalError::incomplete_read("http://mock/efetch.fcgi", "connection closed")
    }

    fn unavailable() -> RetrievalError {
        RetrievalError::http_status("http://mock/efetch.fcgi", 503)
    }

    fn ids() -> Vec<String> {
        vec!["11".to_string(), "12".to_string()]
    }

    #[tokio::test]
    async fn test_incomplete_read_then_success_returns_full_records() {
        let source = ScriptedSource::new(1, incomplete);
        let records = fetch_with_retry(&source, &ids(), Duration::ZERO).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_incomplete_read_propagates() {
        let source = ScriptedSource::new(2, incomplete);
        let err = fetch_with_retry(&source, &ids(), Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, RetrievalError::IncompleteRead { .. }));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let source = ScriptedSource::new(1, unavailable);
        let err = fetch_with_retry(&source, &ids(), Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, RetrievalError::HttpStatus { status: 503, .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_for_backoff() {
        let source = ScriptedSource::new(1, incomplete);
        let started = tokio::time::Instant::now();
        fetch_with_retry(&source, &ids(), DEFAULT_RETRY_BACKOFF).await.unwrap();
        assert!(started.elapsed() >= DEFAULT_RETRY_BACKOFF);
    }
}
