//! Static fallback dataset.
//!
//! Served only when every live adapter has failed, so the discovery
//! experience degrades instead of going dark. Records are embedded at compile
//! time and scheduled relative to the requested window (`day_offset` days
//! after `window.from`), so a degraded response is never empty just because
//! the canned dates went stale.

use std::collections::BTreeSet;

use chrono::{Duration, Timelike};
use serde::Deserialize;

use crate::event::{AccessibilityFlag, Category, Event, TimeWindow};
use crate::geo;

pub const SOURCE_NAME: &str = "fallback";

const FALLBACK_JSON: &str = include_str!("../../data/fallback_events.json");

#[derive(Debug, Deserialize)]
struct FallbackRecord {
    local_id: String,
    title: String,
    description: String,
    category: Category,
    venue_name: String,
    neighborhood: String,
    borough: String,
    /// Days after `window.from` this event is scheduled on.
    day_offset: i64,
    start_hour: u32,
    duration_hours: i64,
    price_min: f32,
    price_max: f32,
    #[serde(default)]
    accessibility_flags: BTreeSet<AccessibilityFlag>,
}

/// Materialize the embedded dataset inside the given window.
pub fn fallback_events(window: &TimeWindow) -> Vec<Event> {
    let records: Vec<FallbackRecord> =
        serde_json::from_str(FALLBACK_JSON).expect("embedded fallback dataset is valid JSON");

    records
        .into_iter()
        .filter_map(|rec| {
            let day = window.from + Duration::days(rec.day_offset);
            let start_time = day
                .with_hour(rec.start_hour)
                .and_then(|d| d.with_minute(0))
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))?;
            if !window.contains(start_time) {
                return None;
            }
            let (latitude, longitude) = geo::centroid(&rec.neighborhood)
                .or_else(|| geo::centroid(&rec.borough))
                .map(|(lat, lon)| (Some(lat), Some(lon)))
                .unwrap_or((None, None));
            Some(
                Event {
                    id: Event::qualified_id(SOURCE_NAME, &rec.local_id),
                    title: rec.title,
                    description: rec.description,
                    category: rec.category,
                    start_time,
                    end_time: Some(start_time + Duration::hours(rec.duration_hours)),
                    venue_name: Some(rec.venue_name),
                    neighborhood: Some(rec.neighborhood),
                    borough: Some(rec.borough),
                    latitude,
                    longitude,
                    price_min: Some(rec.price_min),
                    price_max: Some(rec.price_max),
                    accessibility_flags: rec.accessibility_flags,
                    source: SOURCE_NAME.to_string(),
                    source_url: None,
                    raw_hash: String::new(),
                }
                .sealed(),
            )
        })
        .collect()
}
