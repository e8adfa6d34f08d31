use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_pipeline_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_requests_total", "Aggregation calls served.");
        describe_counter!(
            "aggregate_fallback_served_total",
            "Calls answered from the static fallback dataset."
        );
        describe_counter!(
            "aggregate_events_deduped_total",
            "Events removed as cross-source duplicates."
        );
        describe_counter!(
            "source_events_fetched_total",
            "Normalized events received from sources."
        );
        describe_counter!(
            "source_records_skipped_total",
            "Malformed upstream records skipped."
        );
        describe_counter!("source_fetch_errors_total", "Source fetches that failed.");
        describe_counter!(
            "source_fetch_retries_total",
            "Transient failures retried once."
        );
        describe_counter!(
            "source_rate_limited_total",
            "Fetches skipped on an empty token budget."
        );
        describe_counter!(
            "source_timeouts_total",
            "Sources abandoned at the aggregate deadline."
        );
        describe_histogram!("aggregate_duration_ms", "End-to-end aggregation time.");
        describe_gauge!("aggregate_last_run_ts", "Unix ts of the last aggregation.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder.
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        ensure_pipeline_metrics_described();

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
