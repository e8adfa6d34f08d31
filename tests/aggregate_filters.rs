// tests/aggregate_filters.rs
// Hard filters through the whole pipeline: required accessibility flags and
// the past-event cutoff exclude events entirely, they never just score low.

mod common;

use chrono::{TimeZone, Utc};
use common::{aggregator_with, event_at, week_window, with_flags, MockSource};
use nyc_event_aggregator::event::AccessibilityFlag;
use nyc_event_aggregator::profile::RawProfile;

#[tokio::test]
async fn events_missing_required_flags_never_appear() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let window = week_window(now);

    let accessible = with_flags(
        event_at("nyc_open_data", "1", "Accessible Concert", now, 24),
        &[AccessibilityFlag::Wheelchair, AccessibilityFlag::AslInterpretation],
    );
    let inaccessible = event_at("nyc_open_data", "2", "Walk-up Loft Show", now, 24);

    let agg = aggregator_with(vec![MockSource::ok(
        "nyc_open_data",
        vec![accessible, inaccessible],
    )]);

    let profile = RawProfile {
        accessibility_required: vec!["wheelchair".into()],
        ..Default::default()
    }
    .validate()
    .unwrap();

    let outcome = agg.aggregate(&profile, window, 1, 20, now).await.unwrap();

    assert_eq!(outcome.page.total_count, 1);
    assert_eq!(outcome.page.events[0].event.id, "nyc_open_data:1");
    // The surviving event's breakdown shows the satisfied requirement.
    assert_eq!(
        outcome.page.events[0].score_breakdown["accessibility_match"].raw,
        1.0
    );
}

#[tokio::test]
async fn already_started_events_are_excluded() {
    let now = Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
    // Window opens before `now`, so in-window-but-past events exist.
    let window = nyc_event_aggregator::event::TimeWindow::new(
        now - chrono::Duration::days(3),
        now + chrono::Duration::days(4),
    )
    .unwrap();

    let past = event_at("nyc_open_data", "old", "Yesterday Gala", now, -24);
    let future = event_at("nyc_open_data", "new", "Tomorrow Gala", now, 24);

    let agg = aggregator_with(vec![MockSource::ok("nyc_open_data", vec![past, future])]);

    let outcome = agg
        .aggregate(&Default::default(), window, 1, 20, now)
        .await
        .unwrap();

    assert_eq!(outcome.page.total_count, 1);
    assert_eq!(outcome.page.events[0].event.id, "nyc_open_data:new");
}

#[tokio::test]
async fn missing_end_times_get_the_default_duration() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let window = week_window(now);

    let ev = event_at("nyc_open_data", "1", "Open Rehearsal", now, 24);
    assert!(ev.end_time.is_none());

    let agg = aggregator_with(vec![MockSource::ok("nyc_open_data", vec![ev])]);
    let outcome = agg
        .aggregate(&Default::default(), window, 1, 20, now)
        .await
        .unwrap();

    let out = &outcome.page.events[0].event;
    assert_eq!(out.end_time, Some(out.start_time + chrono::Duration::hours(3)));
}
