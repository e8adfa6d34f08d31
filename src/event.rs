//! Canonical event record plus the normalization helpers every feed is
//! funneled through. Adapters parse provider payloads into `Event`; from that
//! point on the pipeline never looks at provider-specific shapes again.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fixed category set shared by all sources and by preference profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Music,
    Art,
    Food,
    Sports,
    Community,
    Family,
    Nightlife,
    Education,
    Outdoors,
    Other,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Music,
        Category::Art,
        Category::Food,
        Category::Sports,
        Category::Community,
        Category::Family,
        Category::Nightlife,
        Category::Education,
        Category::Outdoors,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Music => "music",
            Category::Art => "art",
            Category::Food => "food",
            Category::Sports => "sports",
            Category::Community => "community",
            Category::Family => "family",
            Category::Nightlife => "nightlife",
            Category::Education => "education",
            Category::Outdoors => "outdoors",
            Category::Other => "other",
        }
    }

    /// Parse a caller-supplied category name. Unknown names are a caller bug
    /// and surface as `ValidationError` at the boundary.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let norm = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == norm)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// Accessibility tags an event can carry; profiles can require any subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityFlag {
    Wheelchair,
    AslInterpretation,
    AudioDescription,
    SensoryFriendly,
    LargePrint,
}

impl AccessibilityFlag {
    pub const ALL: [AccessibilityFlag; 5] = [
        AccessibilityFlag::Wheelchair,
        AccessibilityFlag::AslInterpretation,
        AccessibilityFlag::AudioDescription,
        AccessibilityFlag::SensoryFriendly,
        AccessibilityFlag::LargePrint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessibilityFlag::Wheelchair => "wheelchair",
            AccessibilityFlag::AslInterpretation => "asl_interpretation",
            AccessibilityFlag::AudioDescription => "audio_description",
            AccessibilityFlag::SensoryFriendly => "sensory_friendly",
            AccessibilityFlag::LargePrint => "large_print",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let norm = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == norm)
            .ok_or_else(|| ValidationError::UnknownAccessibilityFlag(s.to_string()))
    }
}

/// Half-open query interval `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ValidationError> {
        if from >= to {
            return Err(ValidationError::EmptyWindow { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts < self.to
    }
}

/// Canonical record describing one real-world happening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Source-qualified id, e.g. `nyc_open_data:21-12345`.
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub start_time: DateTime<Utc>,
    /// May be absent upstream; the aggregator fills in the configured default
    /// duration before the event leaves the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borough: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// `None` = price unknown; `0` = free.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f32>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub accessibility_flags: BTreeSet<AccessibilityFlag>,
    /// Provenance tag, e.g. `nyc_open_data`, `eventbrite`, `fallback`.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Content hash of the normalized fields; stable across re-ingestion.
    pub raw_hash: String,
}

impl Event {
    /// Build the source-qualified id so local ids cannot collide across
    /// providers.
    pub fn qualified_id(source: &str, local_id: &str) -> String {
        format!("{source}:{local_id}")
    }

    /// End of the event, assuming the given default duration when the feed
    /// omitted an end time.
    pub fn end_or_default(&self, default_duration: Duration) -> DateTime<Utc> {
        self.end_time.unwrap_or(self.start_time + default_duration)
    }

    /// Number of populated optional fields. Used as the completeness
    /// tie-break when two records describe the same event.
    pub fn completeness(&self) -> usize {
        let mut n = 0usize;
        n += self.end_time.is_some() as usize;
        n += self.venue_name.is_some() as usize;
        n += self.neighborhood.is_some() as usize;
        n += self.borough.is_some() as usize;
        n += self.latitude.is_some() as usize;
        n += self.longitude.is_some() as usize;
        n += self.price_min.is_some() as usize;
        n += self.price_max.is_some() as usize;
        n += self.source_url.is_some() as usize;
        n += (!self.accessibility_flags.is_empty()) as usize;
        n
    }

    /// Content hash over the normalized fields (short hex, like a commit id).
    /// Stable given identical normalized content, so re-ingesting the same
    /// upstream record is idempotent.
    pub fn content_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0]);
        hasher.update(self.description.as_bytes());
        hasher.update([0]);
        hasher.update(self.category.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.start_time.timestamp().to_be_bytes());
        hasher.update([0]);
        hasher.update(self.venue_name.as_deref().unwrap_or_default().as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(16);
        for b in digest.iter().take(8) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    /// Fill `raw_hash` from the current field content. Adapters call this
    /// last, after normalization.
    pub fn sealed(mut self) -> Self {
        self.raw_hash = self.content_hash();
        self
    }
}

/// Normalize free text coming off a feed: decode HTML entities, strip tags,
/// fold typographic quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Normalize a place name (venue, neighborhood, borough) for comparison:
/// lowercase, separators to spaces, collapsed whitespace.
pub fn normalize_place(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '!', '?', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ev() -> Event {
        Event {
            id: Event::qualified_id("nyc_open_data", "abc"),
            title: "Jazz Night".into(),
            description: "Live jazz in the park".into(),
            category: Category::Music,
            start_time: Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap(),
            end_time: None,
            venue_name: Some("Blue Note".into()),
            neighborhood: None,
            borough: Some("Manhattan".into()),
            latitude: None,
            longitude: None,
            price_min: Some(0.0),
            price_max: Some(0.0),
            accessibility_flags: BTreeSet::new(),
            source: "nyc_open_data".into(),
            source_url: None,
            raw_hash: String::new(),
        }
    }

    #[test]
    fn qualified_ids_carry_the_source() {
        assert_eq!(Event::qualified_id("eventbrite", "42"), "eventbrite:42");
    }

    #[test]
    fn content_hash_is_deterministic_and_field_sensitive() {
        let a = ev().sealed();
        let b = ev().sealed();
        assert_eq!(a.raw_hash, b.raw_hash);

        let mut c = ev();
        c.title = "Blues Night".into();
        let c = c.sealed();
        assert_ne!(a.raw_hash, c.raw_hash);
    }

    #[test]
    fn end_defaults_to_start_plus_duration() {
        let e = ev();
        let end = e.end_or_default(Duration::hours(3));
        assert_eq!(end, e.start_time + Duration::hours(3));
    }

    #[test]
    fn window_rejects_empty_interval() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert!(TimeWindow::new(t, t).is_err());
        let w = TimeWindow::new(t, t + Duration::days(7)).unwrap();
        assert!(w.contains(t));
        assert!(!w.contains(t + Duration::days(7)));
    }

    #[test]
    fn category_and_flag_parsing() {
        assert_eq!(Category::parse(" Music ").unwrap(), Category::Music);
        assert!(Category::parse("opera").is_err());
        assert_eq!(
            AccessibilityFlag::parse("Sensory-Friendly").unwrap(),
            AccessibilityFlag::SensoryFriendly
        );
        assert!(AccessibilityFlag::parse("braille").is_err());
    }

    #[test]
    fn normalize_text_strips_markup_and_collapses_ws() {
        let s = "  <p>Free&nbsp;&nbsp; jazz “tonight”</p>  ";
        assert_eq!(normalize_text(s), "Free jazz \"tonight\"");
    }

    #[test]
    fn normalize_place_folds_punctuation() {
        assert_eq!(normalize_place("Lower—East  Side"), "lower east side");
        assert_eq!(normalize_place("St. Ann's"), "st ann s");
    }
}
