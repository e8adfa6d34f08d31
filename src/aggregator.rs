//! # Aggregator
//! Orchestrates one discovery call: fan-out to every configured source under
//! a shared wall-clock deadline, fan-in through dedupe → hard filters →
//! scoring → ranking, and report per-source outcomes alongside the page.
//!
//! A failing source never fails the call; it is reported in the status list
//! and its events are simply absent. Only `ValidationError` (a caller bug)
//! aborts. When every source fails, the embedded fallback dataset is served
//! so the caller still gets a usable result, with the degradation visible in
//! the statuses.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dedupe;
use crate::error::{SourceErrorKind, ValidationError};
use crate::event::TimeWindow;
use crate::profile::UserPreferenceProfile;
use crate::ranking::{self, RankedPage};
use crate::ratelimit::RateLimiter;
use crate::scoring::{self, ScoredEvent};
use crate::source_priority::SourcePriorityConfig;
use crate::sources::{fallback, run_source, AdapterStatus, EventSource};

/// Result of one aggregation call: the requested page plus one status entry
/// per configured source.
#[derive(Debug)]
pub struct AggregateOutcome {
    pub page: RankedPage,
    pub sources: Vec<AdapterStatus>,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn EventSource>>,
    limiter: Arc<RateLimiter>,
    priorities: Arc<RwLock<SourcePriorityConfig>>,
    cfg: PipelineConfig,
}

impl Aggregator {
    pub fn new(
        cfg: PipelineConfig,
        sources: Vec<Arc<dyn EventSource>>,
        priorities: SourcePriorityConfig,
    ) -> Self {
        crate::metrics::ensure_pipeline_metrics_described();
        let limiter = Arc::new(RateLimiter::new(cfg.ratelimit_config()));
        Self {
            sources,
            limiter,
            priorities: Arc::new(RwLock::new(priorities)),
            cfg,
        }
    }

    /// Shared handle to the priority table (admin reload goes through this).
    pub fn priorities(&self) -> Arc<RwLock<SourcePriorityConfig>> {
        self.priorities.clone()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// The full pipeline up to ranking: fetch, dedupe, filter, score.
    /// Used by `aggregate` and by the statistics endpoint, which needs the
    /// whole scored set rather than one page.
    pub async fn collect(
        &self,
        profile: &UserPreferenceProfile,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> (Vec<ScoredEvent>, Vec<AdapterStatus>) {
        let started = std::time::Instant::now();
        counter!("aggregate_requests_total").increment(1);

        let (mut events, statuses) = self.fan_out(window, now).await;

        // Degraded path: nothing usable from any source.
        let all_failed = statuses.iter().all(|s| !s.ok);
        if all_failed {
            warn!("every source failed; serving the static fallback dataset");
            counter!("aggregate_fallback_served_total").increment(1);
            events = fallback::fallback_events(&window);
        }

        // Feeds are trusted to filter, but the window bound is an output
        // invariant, so enforce it here as well.
        events.retain(|e| window.contains(e.start_time));

        // Documented assumption: events without an end run for the
        // configured default duration.
        let default_duration = self.cfg.default_event_duration();
        for e in &mut events {
            if e.end_time.is_none() {
                e.end_time = Some(e.start_time + default_duration);
            }
        }

        let fetched = events.len();
        let pri = self
            .priorities
            .read()
            .expect("priority config lock poisoned")
            .clone();
        let events = dedupe::dedupe(events, &self.cfg.dedupe_config(), &pri);
        let deduped = events.len();
        counter!("aggregate_events_deduped_total").increment((fetched - deduped) as u64);

        let scored: Vec<ScoredEvent> = events
            .into_iter()
            .filter(|e| scoring::passes_hard_filters(e, profile, now))
            .map(|e| scoring::score(e, profile, now))
            .collect();

        histogram!("aggregate_duration_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        gauge!("aggregate_last_run_ts").set(now.timestamp() as f64);
        info!(
            fetched,
            deduped,
            scored = scored.len(),
            degraded = all_failed,
            "aggregation pass"
        );

        (scored, statuses)
    }

    /// One discovery call. `now` is the query's clock; everything below this
    /// boundary is deterministic in it.
    pub async fn aggregate(
        &self,
        profile: &UserPreferenceProfile,
        window: TimeWindow,
        page: usize,
        page_size: usize,
        now: DateTime<Utc>,
    ) -> Result<AggregateOutcome, ValidationError> {
        // Caller bugs abort before any fetch work happens.
        ranking::validate_paging(page, page_size)?;

        let (scored, sources) = self.collect(profile, window, now).await;
        let page = ranking::rank(scored, page, page_size)?;

        Ok(AggregateOutcome { page, sources })
    }

    /// Fan out to all sources concurrently, one task per source, all bounded
    /// by a single deadline. Tasks still running at the deadline are
    /// abandoned and reported as timed out; their late results are dropped.
    async fn fan_out(
        &self,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> (Vec<crate::event::Event>, Vec<AdapterStatus>) {
        let max_results = self.cfg.aggregator.max_results_per_source;
        let deadline = tokio::time::Instant::now() + self.cfg.fetch_timeout();

        let handles: Vec<(String, tokio::task::JoinHandle<_>)> = self
            .sources
            .iter()
            .map(|src| {
                let src = Arc::clone(src);
                let limiter = Arc::clone(&self.limiter);
                let name = src.name().to_string();
                let handle = tokio::spawn(async move {
                    run_source(src.as_ref(), &window, max_results, &limiter, now).await
                });
                (name, handle)
            })
            .collect();

        let mut events = Vec::new();
        let mut statuses = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok((mut evs, status))) => {
                    events.append(&mut evs);
                    statuses.push(status);
                }
                Ok(Err(join_err)) => {
                    warn!(source = %name, error = %join_err, "source task failed");
                    statuses.push(AdapterStatus::failure(
                        &name,
                        SourceErrorKind::Permanent,
                        format!("source task failed: {join_err}"),
                    ));
                }
                Err(_) => {
                    warn!(source = %name, "source exceeded the aggregate deadline");
                    counter!("source_timeouts_total").increment(1);
                    statuses.push(AdapterStatus::failure(
                        &name,
                        SourceErrorKind::TimedOut,
                        "exceeded aggregate wall-clock budget",
                    ));
                }
            }
        }
        (events, statuses)
    }
}
