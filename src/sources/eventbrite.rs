//! Eventbrite adapter.
//!
//! Commercial feed, bearer-token authenticated. Category ids are numeric and
//! mapped onto the canonical set; pricing comes from `ticket_availability`
//! plus the ticket-class cost range, and stays `None` ("unknown") when the
//! listing exposes neither.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::SourceError;
use crate::event::{normalize_text, Category, Event, TimeWindow};
use crate::sources::{EventSource, FetchBatch};

pub const SOURCE_NAME: &str = "eventbrite";
const SEARCH_ENDPOINT: &str = "https://www.eventbriteapi.com/v3/events/search/";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: Option<String>,
    name: Option<TextField>,
    description: Option<TextField>,
    category_id: Option<String>,
    url: Option<String>,
    start: Option<WhenField>,
    end: Option<WhenField>,
    venue: Option<RawVenue>,
    ticket_availability: Option<TicketAvailability>,
    #[serde(default)]
    ticket_classes: Vec<TicketClass>,
}

#[derive(Debug, Deserialize)]
struct TextField {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhenField {
    utc: Option<String>,
    local: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVenue {
    name: Option<String>,
    address: Option<RawAddress>,
    latitude: Option<String>,
    longitude: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    city: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TicketAvailability {
    is_free: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TicketClass {
    cost: Option<TicketCost>,
}

#[derive(Debug, Deserialize)]
struct TicketCost {
    /// The API serializes this as a decimal string ("25.00"); tolerate a
    /// bare number too.
    major_value: Option<serde_json::Value>,
}

pub struct EventbriteSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        token: String,
        client: reqwest::Client,
    },
}

impl EventbriteSource {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                token: token.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    /// Live adapter; `token` is the `EVENTBRITE_API_KEY` bearer token.
    pub fn live(token: impl Into<String>) -> Self {
        Self::from_url(SEARCH_ENDPOINT, token)
    }

    fn parse_payload(
        s: &str,
        window: &TimeWindow,
        max_results: usize,
    ) -> Result<FetchBatch, SourceError> {
        let resp: SearchResponse = serde_json::from_str(s)
            .map_err(|e| SourceError::permanent(format!("eventbrite payload: {e}")))?;

        let mut batch = FetchBatch::default();
        for raw in resp.events {
            if batch.events.len() >= max_results {
                break;
            }
            match convert(raw) {
                Some(ev) if window.contains(ev.start_time) => batch.events.push(ev),
                Some(_) => {}
                None => batch.skipped += 1,
            }
        }
        Ok(batch)
    }
}

fn convert(raw: RawEvent) -> Option<Event> {
    let local_id = raw.id.as_deref()?.trim();
    if local_id.is_empty() {
        return None;
    }
    let title = normalize_text(raw.name.as_ref()?.text.as_deref()?);
    if title.is_empty() {
        return None;
    }
    let start_time = raw.start.as_ref().and_then(parse_when)?;
    let end_time = raw.end.as_ref().and_then(parse_when);

    let description = raw
        .description
        .as_ref()
        .and_then(|d| d.text.as_deref())
        .map(normalize_text)
        .unwrap_or_default();

    let (price_min, price_max) = price_range(&raw);

    let venue_name = raw
        .venue
        .as_ref()
        .and_then(|v| v.name.as_deref())
        .map(normalize_text)
        .filter(|v| !v.is_empty());
    let borough = raw
        .venue
        .as_ref()
        .and_then(|v| v.address.as_ref())
        .and_then(|a| a.city.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    let latitude = raw
        .venue
        .as_ref()
        .and_then(|v| v.latitude.as_deref())
        .and_then(|s| s.parse::<f64>().ok());
    let longitude = raw
        .venue
        .as_ref()
        .and_then(|v| v.longitude.as_deref())
        .and_then(|s| s.parse::<f64>().ok());

    Some(
        Event {
            id: Event::qualified_id(SOURCE_NAME, local_id),
            title,
            description,
            category: map_category_id(raw.category_id.as_deref().unwrap_or_default()),
            start_time,
            end_time,
            venue_name,
            neighborhood: None,
            borough,
            latitude,
            longitude,
            price_min,
            price_max,
            accessibility_flags: Default::default(),
            source: SOURCE_NAME.to_string(),
            source_url: raw.url,
            raw_hash: String::new(),
        }
        .sealed(),
    )
}

fn parse_when(when: &WhenField) -> Option<DateTime<Utc>> {
    if let Some(utc) = when.utc.as_deref() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(utc) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // Fall back to the naive local stamp.
    let local = when.local.as_deref()?.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(local, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// `(None, None)` means price unknown, per the canonical model.
fn price_range(raw: &RawEvent) -> (Option<f32>, Option<f32>) {
    if raw
        .ticket_availability
        .as_ref()
        .and_then(|t| t.is_free)
        .unwrap_or(false)
    {
        return (Some(0.0), Some(0.0));
    }

    let mut costs: Vec<f32> = raw
        .ticket_classes
        .iter()
        .filter_map(|tc| tc.cost.as_ref())
        .filter_map(|c| c.major_value.as_ref())
        .filter_map(major_value_as_f32)
        .collect();
    if costs.is_empty() {
        return (None, None);
    }
    costs.sort_by(f32::total_cmp);
    (costs.first().copied(), costs.last().copied())
}

fn major_value_as_f32(v: &serde_json::Value) -> Option<f32> {
    match v {
        serde_json::Value::String(s) => s.trim().parse::<f32>().ok(),
        serde_json::Value::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    }
}

/// Eventbrite's numeric category taxonomy → canonical categories.
fn map_category_id(category_id: &str) -> Category {
    match category_id {
        "103" => Category::Music,
        "105" => Category::Food,
        "110" => Category::Art,
        "111" => Category::Art,  // Film & Media
        "113" => Category::Sports,
        "114" => Category::Outdoors, // Health & Fitness
        "115" => Category::Education, // Science & Tech
        "116" => Category::Outdoors, // Travel & Outdoor
        "117" => Category::Community, // Charity & Causes
        "119" => Category::Family,
        "120" => Category::Community, // Seasonal & Holiday
        "126" => Category::Education, // School Activities
        _ => Category::Other,
    }
}

#[async_trait]
impl EventSource for EventbriteSource {
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
            Mode::Http { url, token, client } => {
                let resp = client
                    .get(url)
                    .bearer_auth(token)
                    .query(&[
                        ("location.address", "New York, NY".to_string()),
                        ("expand", "venue,ticket_availability".to_string()),
                        ("status", "live".to_string()),
                        (
                            "start_date.range_start",
                            window.from.format("%Y-%m-%dT%H:%M:%S").to_string(),
                        ),
                        (
                            "start_date.range_end",
                            window.to.format("%Y-%m-%dT%H:%M:%S").to_string(),
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
                        format!("eventbrite returned {status}"),
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
