// tests/common/mod.rs
// Shared mock source + event builders for the integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use nyc_event_aggregator::aggregator::Aggregator;
use nyc_event_aggregator::config::PipelineConfig;
use nyc_event_aggregator::error::SourceError;
use nyc_event_aggregator::event::{AccessibilityFlag, Category, Event, TimeWindow};
use nyc_event_aggregator::source_priority::SourcePriorityConfig;
use nyc_event_aggregator::sources::{EventSource, FetchBatch};

pub enum Behavior {
    /// Return these events (window filtering is up to the test data).
    Events(Vec<Event>),
    /// Fail every fetch with this error.
    Fail(fn() -> SourceError),
    /// Sleep far past any deadline, then return nothing.
    Hang,
}

pub struct MockSource {
    pub name: String,
    pub behavior: Behavior,
}

impl MockSource {
    pub fn ok(name: &str, events: Vec<Event>) -> Arc<dyn EventSource> {
        Arc::new(Self {
            name: name.to_string(),
            behavior: Behavior::Events(events),
        })
    }

    pub fn failing(name: &str, make_err: fn() -> SourceError) -> Arc<dyn EventSource> {
        Arc::new(Self {
            name: name.to_string(),
            behavior: Behavior::Fail(make_err),
        })
    }

    pub fn hanging(name: &str) -> Arc<dyn EventSource> {
        Arc::new(Self {
            name: name.to_string(),
            behavior: Behavior::Hang,
        })
    }
}

#[async_trait]
impl EventSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        _window: &TimeWindow,
        _max_results: usize,
    ) -> Result<FetchBatch, SourceError> {
        match &self.behavior {
            Behavior::Events(events) => Ok(FetchBatch {
                events: events.clone(),
                skipped: 0,
            }),
            Behavior::Fail(make_err) => Err(make_err()),
            Behavior::Hang => {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                Ok(FetchBatch::default())
            }
        }
    }
}

/// An event `hours` after `base`, minimal but valid.
pub fn event_at(source: &str, local_id: &str, title: &str, base: DateTime<Utc>, hours: i64) -> Event {
    Event {
        id: Event::qualified_id(source, local_id),
        title: title.to_string(),
        description: format!("{title} description"),
        category: Category::Music,
        start_time: base + Duration::hours(hours),
        end_time: None,
        venue_name: Some("Test Hall".to_string()),
        neighborhood: None,
        borough: Some("Manhattan".to_string()),
        latitude: None,
        longitude: None,
        price_min: Some(0.0),
        price_max: Some(0.0),
        accessibility_flags: BTreeSet::new(),
        source: source.to_string(),
        source_url: None,
        raw_hash: String::new(),
    }
    .sealed()
}

pub fn with_flags(mut event: Event, flags: &[AccessibilityFlag]) -> Event {
    event.accessibility_flags = flags.iter().copied().collect();
    event.sealed()
}

/// Week-long window starting at `from`.
pub fn week_window(from: DateTime<Utc>) -> TimeWindow {
    TimeWindow::new(from, from + Duration::days(7)).expect("non-empty window")
}

pub fn aggregator_with(sources: Vec<Arc<dyn EventSource>>) -> Aggregator {
    aggregator_with_cfg(PipelineConfig::default(), sources)
}

pub fn aggregator_with_cfg(
    cfg: PipelineConfig,
    sources: Vec<Arc<dyn EventSource>>,
) -> Aggregator {
    let priorities = SourcePriorityConfig::load_from_file("config/source_priority.json");
    Aggregator::new(cfg, sources, priorities)
}
