// tests/aggregate_partial_failure.rs
// One flaky source must never take down the whole discovery call.

mod common;

use chrono::{TimeZone, Utc};
use common::{aggregator_with, event_at, week_window, MockSource};
use nyc_event_aggregator::error::{SourceError, SourceErrorKind};
use nyc_event_aggregator::profile::UserPreferenceProfile;

#[tokio::test]
async fn two_sources_succeed_while_one_fails_transiently() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let window = week_window(now);

    let agg = aggregator_with(vec![
        MockSource::ok(
            "nyc_open_data",
            vec![
                event_at("nyc_open_data", "1", "Harlem Street Fair", now, 24),
                event_at("nyc_open_data", "2", "Bryant Park Movie", now, 48),
            ],
        ),
        MockSource::failing("eventbrite", || SourceError::transient("503 from upstream")),
        MockSource::ok(
            "nyc_parks",
            vec![event_at("nyc_parks", "7", "Prospect Park Run", now, 30)],
        ),
    ]);

    let outcome = agg
        .aggregate(&UserPreferenceProfile::default(), window, 1, 20, now)
        .await
        .expect("partial failure must not surface as an error");

    assert_eq!(outcome.page.total_count, 3);
    let sources_of_events: Vec<_> = outcome
        .page
        .events
        .iter()
        .map(|s| s.event.source.as_str())
        .collect();
    assert!(sources_of_events.contains(&"nyc_open_data"));
    assert!(sources_of_events.contains(&"nyc_parks"));
    assert!(!sources_of_events.contains(&"fallback"));

    assert_eq!(outcome.sources.len(), 3);
    let eb = outcome
        .sources
        .iter()
        .find(|s| s.source == "eventbrite")
        .unwrap();
    assert!(!eb.ok);
    assert_eq!(eb.error_kind, Some(SourceErrorKind::Transient));
    assert!(outcome
        .sources
        .iter()
        .filter(|s| s.source != "eventbrite")
        .all(|s| s.ok));
}

#[tokio::test]
async fn permanent_failure_is_reported_with_its_kind() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let window = week_window(now);

    let agg = aggregator_with(vec![
        MockSource::ok(
            "nyc_open_data",
            vec![event_at("nyc_open_data", "1", "Harbor Concert", now, 12)],
        ),
        MockSource::failing("eventbrite", || SourceError::permanent("401 bad token")),
    ]);

    let outcome = agg
        .aggregate(&UserPreferenceProfile::default(), window, 1, 20, now)
        .await
        .unwrap();

    assert_eq!(outcome.page.total_count, 1);
    let eb = outcome
        .sources
        .iter()
        .find(|s| s.source == "eventbrite")
        .unwrap();
    assert_eq!(eb.error_kind, Some(SourceErrorKind::Permanent));
}

#[tokio::test]
async fn hanging_source_is_timed_out_not_awaited_forever() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let window = week_window(now);

    let mut cfg = nyc_event_aggregator::config::PipelineConfig::default();
    cfg.aggregator.fetch_timeout_secs = 1;

    let agg = common::aggregator_with_cfg(
        cfg,
        vec![
            MockSource::ok(
                "nyc_open_data",
                vec![event_at("nyc_open_data", "1", "Fast Result", now, 12)],
            ),
            MockSource::hanging("eventbrite"),
        ],
    );

    let started = std::time::Instant::now();
    let outcome = agg
        .aggregate(&UserPreferenceProfile::default(), window, 1, 20, now)
        .await
        .unwrap();
    assert!(
        started.elapsed() < std::time::Duration::from_secs(10),
        "deadline must bound the call"
    );

    assert_eq!(outcome.page.total_count, 1);
    let eb = outcome
        .sources
        .iter()
        .find(|s| s.source == "eventbrite")
        .unwrap();
    assert!(!eb.ok);
    assert_eq!(eb.error_kind, Some(SourceErrorKind::TimedOut));
}
