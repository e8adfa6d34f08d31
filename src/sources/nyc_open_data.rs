//! NYC Open Data (Socrata) adapter.
//!
//! The city's events dataset is free and unauthenticated. Raw records are
//! parsed into an intermediate struct first and only validated records become
//! canonical events; a record missing its id, name or start time is skipped
//! and counted, never fatal for the batch.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::SourceError;
use crate::event::{normalize_text, Category, Event, TimeWindow};
use crate::geo;
use crate::sources::{EventSource, FetchBatch};

pub const SOURCE_NAME: &str = "nyc_open_data";
const EVENTS_ENDPOINT: &str = "https://data.cityofnewyork.us/resource/tvpp-9vvx.json";

/// Raw Socrata record shape. Everything optional; validation happens when we
/// convert, not while deserializing the array.
#[derive(Debug, Deserialize)]
struct RawRecord {
    event_id: Option<String>,
    event_name: Option<String>,
    event_type: Option<String>,
    event_borough: Option<String>,
    event_location: Option<String>,
    event_agency: Option<String>,
    start_date_time: Option<String>,
    end_date_time: Option<String>,
}

pub struct NycOpenDataSource {
    mode: Mode,
}

enum Mode {
    /// Canned payload for tests and offline runs.
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl NycOpenDataSource {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Live adapter against the city's public endpoint.
    pub fn live() -> Self {
        Self::from_url(EVENTS_ENDPOINT)
    }

    fn parse_payload(s: &str, window: &TimeWindow, max_results: usize) -> Result<FetchBatch, SourceError> {
        let records: Vec<RawRecord> = serde_json::from_str(s)
            .map_err(|e| SourceError::permanent(format!("nyc open data payload: {e}")))?;

        let mut batch = FetchBatch::default();
        for rec in records {
            if batch.events.len() >= max_results {
                break;
            }
            match convert(rec) {
                Some(ev) if window.contains(ev.start_time) => batch.events.push(ev),
                Some(_) => {} // outside the requested window, silently dropped
                None => batch.skipped += 1,
            }
        }
        Ok(batch)
    }
}

/// Turn one raw record into a canonical event, or `None` if the record is
/// missing a required field.
fn convert(rec: RawRecord) -> Option<Event> {
    let local_id = rec.event_id.as_deref()?.trim();
    if local_id.is_empty() {
        return None;
    }
    let title = normalize_text(rec.event_name.as_deref()?);
    if title.is_empty() {
        return None;
    }
    let start_time = parse_city_timestamp(rec.start_date_time.as_deref()?)?;
    let end_time = rec.end_date_time.as_deref().and_then(parse_city_timestamp);

    let category = map_event_type(rec.event_type.as_deref().unwrap_or_default());
    let borough = rec
        .event_borough
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);
    let venue_name = rec
        .event_location
        .as_deref()
        .map(normalize_text)
        .filter(|v| !v.is_empty());

    let description = {
        let mut d = title.clone();
        if let Some(t) = rec.event_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            d.push_str(" - ");
            d.push_str(t);
        }
        if let Some(b) = borough.as_deref() {
            d.push_str(" in ");
            d.push_str(b);
        }
        if let Some(a) = rec.event_agency.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            d.push_str(" (");
            d.push_str(a);
            d.push(')');
        }
        d
    };

    let (latitude, longitude) = borough
        .as_deref()
        .and_then(geo::centroid)
        .map(|(lat, lon)| (Some(lat), Some(lon)))
        .unwrap_or((None, None));

    Some(
        Event {
            id: Event::qualified_id(SOURCE_NAME, local_id),
            title,
            description,
            category,
            start_time,
            end_time,
            venue_name,
            neighborhood: None,
            borough,
            latitude,
            longitude,
            // City-run events are free admission.
            price_min: Some(0.0),
            price_max: Some(0.0),
            accessibility_flags: Default::default(),
            source: SOURCE_NAME.to_string(),
            source_url: None,
            raw_hash: String::new(),
        }
        .sealed(),
    )
}

/// The city feed writes naive ISO timestamps like `2025-09-21T08:00:00.000`.
fn parse_city_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim().trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Map the city's free-form `event_type` onto the canonical category set.
fn map_event_type(event_type: &str) -> Category {
    let t = event_type.to_ascii_lowercase();
    if t.is_empty() {
        return Category::Other;
    }
    if t.contains("sport") {
        Category::Sports
    } else if t.contains("concert") || t.contains("music") {
        Category::Music
    } else if t.contains("art") || t.contains("exhibit") {
        Category::Art
    } else if t.contains("food") || t.contains("market") {
        Category::Food
    } else if t.contains("yoga") || t.contains("fitness") || t.contains("wellness") {
        Category::Outdoors
    } else if t.contains("class") || t.contains("workshop") || t.contains("education") {
        Category::Education
    } else if t.contains("family") || t.contains("youth") {
        Category::Family
    } else if t.contains("celebration") || t.contains("parade") || t.contains("street") {
        Category::Community
    } else if t.contains("special event") {
        Category::Community
    } else {
        Category::Other
    }
}

#[async_trait]
impl EventSource for NycOpenDataSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(
        &self,
        window: &TimeWindow,
        max_results: usize,
    ) -> Result<FetchBatch, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_payload(s, window, max_results),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url)
                    .query(&[
                        ("$limit", max_results.min(1000).to_string()),
                        ("$order", "start_date_time ASC".to_string()),
                        (
                            "$where",
                            format!(
                                "start_date_time >= '{}' AND start_date_time < '{}'",
                                window.from.format("%Y-%m-%dT%H:%M:%S%.3f"),
                                window.to.format("%Y-%m-%dT%H:%M:%S%.3f"),
                            ),
                        ),
                    ])
                    .timeout(std::time::Duration::from_secs(30))
                    .send()
                    .await
                    .map_err(|e| SourceError::from_http(&e))?;

                let status = resp.status();
                if !status.is_success() {
                    return Err(SourceError::from_status(
                        status.as_u16(),
                        format!("nyc open data returned {status}"),
                    ));
                }

                let body = resp
                    .text()
                    .await
                    .map_err(|e| SourceError::from_http(&e))?;
                Self::parse_payload(&body, window, max_results)
            }
        }
    }
}
