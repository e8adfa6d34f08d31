//! Summary statistics over an aggregation result, for the UI's overview
//! widgets: how much is on, where, in which categories, and what it costs.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoredEvent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStats {
    pub total_events: usize,
    /// Counts keyed by canonical category name.
    pub categories: BTreeMap<String, usize>,
    /// Counts keyed by borough; events without one land under "unknown".
    pub boroughs: BTreeMap<String, usize>,
    pub free_count: usize,
    pub paid_count: usize,
    pub unknown_price_count: usize,
    /// Events starting within 24 hours of `now`.
    pub starting_within_24h: usize,
    /// Events starting within 7 days of `now`.
    pub starting_this_week: usize,
}

pub fn summarize(events: &[ScoredEvent], now: DateTime<Utc>) -> EventStats {
    let mut stats = EventStats {
        total_events: events.len(),
        ..Default::default()
    };

    let day = now + Duration::hours(24);
    let week = now + Duration::days(7);

    for s in events {
        let e = &s.event;
        *stats
            .categories
            .entry(e.category.as_str().to_string())
            .or_insert(0) += 1;
        *stats
            .boroughs
            .entry(e.borough.clone().unwrap_or_else(|| "unknown".to_string()))
            .or_insert(0) += 1;

        match e.price_min {
            None => stats.unknown_price_count += 1,
            Some(p) if p <= 0.0 => stats.free_count += 1,
            Some(_) => stats.paid_count += 1,
        }

        if e.start_time >= now && e.start_time <= day {
            stats.starting_within_24h += 1;
        }
        if e.start_time >= now && e.start_time <= week {
            stats.starting_this_week += 1;
        }
    }

    stats
}
