// src/sources/mod.rs
pub mod eventbrite;
pub mod fallback;
pub mod nyc_open_data;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceErrorKind};
use crate::event::{Event, TimeWindow};
use crate::ratelimit::RateLimiter;

/// Delay before the single retry of a transient failure.
pub const RETRY_BACKOFF_MS: u64 = 250;

/// One normalized batch from a provider. `skipped` counts individual records
/// that failed validation and were dropped without aborting the fetch.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub events: Vec<Event>,
    pub skipped: usize,
}

/// A source of canonical events. Each implementation owns the translation
/// from one provider's HTTP/REST contract into `Event`; the pipeline treats
/// providers as opaque behind this trait.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Canonical source name; also the provenance tag on emitted events.
    fn name(&self) -> &str;

    /// Fetch raw records inside `[window.from, window.to)`, at most
    /// `max_results` of them, normalized into canonical events.
    async fn fetch(&self, window: &TimeWindow, max_results: usize)
        -> Result<FetchBatch, SourceError>;
}

/// Per-source outcome report returned alongside every aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub source: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<SourceErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub fetched_count: usize,
    pub skipped_count: usize,
}

impl AdapterStatus {
    pub fn success(source: &str, fetched: usize, skipped: usize) -> Self {
        Self {
            source: source.to_string(),
            ok: true,
            error_kind: None,
            message: None,
            fetched_count: fetched,
            skipped_count: skipped,
        }
    }

    pub fn failure(source: &str, kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            ok: false,
            error_kind: Some(kind),
            message: Some(message.into()),
            fetched_count: 0,
            skipped_count: 0,
        }
    }
}

/// Run one adapter: spend a rate-limit token, fetch, retry transient failures
/// exactly once with a short backoff, and fold the outcome into a status.
/// Failures never escape this boundary.
pub async fn run_source(
    source: &dyn EventSource,
    window: &TimeWindow,
    max_results: usize,
    limiter: &RateLimiter,
    now: DateTime<Utc>,
) -> (Vec<Event>, AdapterStatus) {
    let name = source.name().to_string();

    if !limiter.try_acquire(&name, now) {
        counter!("source_rate_limited_total").increment(1);
        tracing::warn!(source = %name, "rate-limit budget exhausted, skipping fetch");
        return (
            Vec::new(),
            AdapterStatus::failure(
                &name,
                SourceErrorKind::RateLimited,
                "per-source rate-limit budget exhausted",
            ),
        );
    }

    let first = source.fetch(window, max_results).await;
    let outcome = match first {
        Ok(batch) => Ok(batch),
        Err(err) if err.is_retryable() => {
            tracing::warn!(source = %name, error = %err, "transient fetch error, retrying once");
            counter!("source_fetch_retries_total").increment(1);
            tokio::time::sleep(std::time::Duration::from_millis(RETRY_BACKOFF_MS)).await;
            source.fetch(window, max_results).await
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(batch) => {
            counter!("source_events_fetched_total").increment(batch.events.len() as u64);
            if batch.skipped > 0 {
                counter!("source_records_skipped_total").increment(batch.skipped as u64);
            }
            let status = AdapterStatus::success(&name, batch.events.len(), batch.skipped);
            (batch.events, status)
        }
        Err(err) => {
            counter!("source_fetch_errors_total").increment(1);
            tracing::warn!(source = %name, error = %err, "fetch failed");
            (
                Vec::new(),
                AdapterStatus::failure(&name, err.kind, err.message),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::RateLimitConfig;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySource {
        calls: AtomicUsize,
        fail_kind: Option<SourceErrorKind>,
        fail_times: usize,
    }

    #[async_trait]
    impl EventSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch(
            &self,
            _window: &TimeWindow,
            _max_results: usize,
        ) -> Result<FetchBatch, SourceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                let kind = self.fail_kind.unwrap();
                return Err(SourceError {
                    kind,
                    message: "boom".into(),
                });
            }
            Ok(FetchBatch::default())
        }
    }

    fn window() -> TimeWindow {
        let from = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        TimeWindow::new(from, from + Duration::days(7)).unwrap()
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            burst: 10,
            refill_secs: 1,
        })
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once_then_succeeds() {
        let src = FlakySource {
            calls: AtomicUsize::new(0),
            fail_kind: Some(SourceErrorKind::Transient),
            fail_times: 1,
        };
        let now = window().from;
        let (_, status) = run_source(&src, &window(), 50, &limiter(), now).await;
        assert!(status.ok);
        assert_eq!(src.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_at_most_once() {
        let src = FlakySource {
            calls: AtomicUsize::new(0),
            fail_kind: Some(SourceErrorKind::Transient),
            fail_times: 5,
        };
        let now = window().from;
        let (events, status) = run_source(&src, &window(), 50, &limiter(), now).await;
        assert!(events.is_empty());
        assert!(!status.ok);
        assert_eq!(status.error_kind, Some(SourceErrorKind::Transient));
        assert_eq!(src.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let src = FlakySource {
            calls: AtomicUsize::new(0),
            fail_kind: Some(SourceErrorKind::Permanent),
            fail_times: 5,
        };
        let now = window().from;
        let (_, status) = run_source(&src, &window(), 50, &limiter(), now).await;
        assert!(!status.ok);
        assert_eq!(status.error_kind, Some(SourceErrorKind::Permanent));
        assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_short_circuits_without_calling_the_source() {
        let src = FlakySource {
            calls: AtomicUsize::new(0),
            fail_kind: None,
            fail_times: 0,
        };
        let rl = RateLimiter::new(RateLimitConfig {
            burst: 1,
            refill_secs: 3600,
        });
        let now = window().from;
        let (_, first) = run_source(&src, &window(), 50, &rl, now).await;
        assert!(first.ok);

        let (_, second) = run_source(&src, &window(), 50, &rl, now).await;
        assert!(!second.ok);
        assert_eq!(second.error_kind, Some(SourceErrorKind::RateLimited));
        assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    }
}
