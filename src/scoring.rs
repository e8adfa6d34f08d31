//! # Preference Scorer
//! Pure mapping from `(Event, UserPreferenceProfile, now)` → `ScoredEvent`.
//! No I/O, no clock reads; deterministic for identical inputs.
//!
//! The score is a fixed linear blend of independent factors, each in [0, 1].
//! Every factor's raw value, effective weight and weighted contribution is
//! kept in the breakdown so a caller can explain the ordering to the user
//! and tests can pin individual rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{normalize_place, Event};
use crate::profile::UserPreferenceProfile;

pub const W_CATEGORY: f32 = 0.35;
pub const W_BUDGET: f32 = 0.25;
pub const W_NEIGHBORHOOD: f32 = 0.20;
pub const W_ACCESSIBILITY: f32 = 0.10;
pub const W_RECENCY: f32 = 0.10;

/// Weight of the keyword factor when `free_text_interest` is present; the
/// five base weights are rescaled by `1 - W_KEYWORDS` so the blend still
/// sums to 1.0.
pub const W_KEYWORDS: f32 = 0.15;

/// Recency decays linearly from 1.0 at this horizon...
const RECENCY_FULL_HOURS: f32 = 24.0;
/// ...to 0.0 at this one.
const RECENCY_ZERO_HOURS: f32 = 30.0 * 24.0;

/// One factor's contribution to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    /// Raw factor value in [0, 1].
    pub raw: f32,
    /// Effective weight after any rescaling.
    pub weight: f32,
    /// `raw * weight`.
    pub weighted: f32,
}

/// Event annotated with its relevance score and the factor breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    #[serde(flatten)]
    pub event: Event,
    pub score: f32,
    pub score_breakdown: BTreeMap<String, FactorScore>,
}

/// Hard filters applied before any scoring: events already started and
/// events missing a required accessibility flag are excluded entirely, not
/// scored low.
pub fn passes_hard_filters(
    event: &Event,
    profile: &UserPreferenceProfile,
    now: DateTime<Utc>,
) -> bool {
    if event.start_time < now {
        return false;
    }
    profile
        .accessibility_required
        .iter()
        .all(|f| event.accessibility_flags.contains(f))
}

/// Score one event against the profile. Assumes `passes_hard_filters` held.
pub fn score(event: Event, profile: &UserPreferenceProfile, now: DateTime<Utc>) -> ScoredEvent {
    let keywords = interest_keywords(profile);
    let kw_active = !keywords.is_empty();
    // Base weights shrink to make room for the keyword factor when the
    // profile carries free text.
    let rescale = if kw_active { 1.0 - W_KEYWORDS } else { 1.0 };

    let mut breakdown = BTreeMap::new();
    let mut total = 0.0f32;
    let mut push = |name: &str, raw: f32, weight: f32| {
        let weighted = raw * weight;
        total += weighted;
        breakdown.insert(name.to_string(), FactorScore { raw, weight, weighted });
    };

    push(
        "category_match",
        category_match(&event, profile),
        W_CATEGORY * rescale,
    );
    push("budget_fit", budget_fit(&event, profile), W_BUDGET * rescale);
    push(
        "neighborhood_match",
        neighborhood_match(&event, profile),
        W_NEIGHBORHOOD * rescale,
    );
    push(
        "accessibility_match",
        accessibility_match(&event, profile),
        W_ACCESSIBILITY * rescale,
    );
    push("recency", recency(&event, now), W_RECENCY * rescale);
    if kw_active {
        push("keyword_affinity", keyword_affinity(&event, &keywords), W_KEYWORDS);
    }

    ScoredEvent {
        event,
        score: clamp01(total),
        score_breakdown: breakdown,
    }
}

/// 1.0 when the profile has no category preference or the event matches one.
fn category_match(event: &Event, profile: &UserPreferenceProfile) -> f32 {
    if profile.categories.is_empty() || profile.categories.contains(&event.category) {
        1.0
    } else {
        0.0
    }
}

/// 1.0 for free/unknown-price events or anything within budget; linear decay
/// to 0.0 at twice the budget.
fn budget_fit(event: &Event, profile: &UserPreferenceProfile) -> f32 {
    let price = match event.price_min {
        None => return 1.0,
        Some(p) if p <= 0.0 => return 1.0,
        Some(p) => p,
    };
    let budget = match profile.budget_max {
        None => return 1.0, // unbounded
        Some(b) => b,
    };
    if price <= budget {
        return 1.0;
    }
    if budget <= 0.0 {
        return 0.0;
    }
    clamp01(1.0 - (price - budget) / budget)
}

/// 1.0 on a neighborhood/borough hit; 0.2 otherwise. An event one borough
/// over is still weakly relevant, unlike a category miss.
fn neighborhood_match(event: &Event, profile: &UserPreferenceProfile) -> f32 {
    if profile.neighborhoods.is_empty() {
        return 1.0;
    }
    let hit = profile.neighborhoods.iter().any(|want| {
        let w = normalize_place(want);
        event
            .neighborhood
            .as_deref()
            .map(normalize_place)
            .is_some_and(|n| n == w)
            || event
                .borough
                .as_deref()
                .map(normalize_place)
                .is_some_and(|b| b == w)
    });
    if hit {
        1.0
    } else {
        0.2
    }
}

/// Hard-filtered upstream; recomputed here so the breakdown stays honest.
fn accessibility_match(event: &Event, profile: &UserPreferenceProfile) -> f32 {
    let ok = profile
        .accessibility_required
        .iter()
        .all(|f| event.accessibility_flags.contains(f));
    if ok {
        1.0
    } else {
        0.0
    }
}

/// 1.0 for events starting within 24h of `now`, decaying linearly to 0.0 at
/// 30 days out.
fn recency(event: &Event, now: DateTime<Utc>) -> f32 {
    let hours = (event.start_time - now).num_minutes() as f32 / 60.0;
    if hours <= RECENCY_FULL_HOURS {
        return 1.0;
    }
    if hours >= RECENCY_ZERO_HOURS {
        return 0.0;
    }
    1.0 - (hours - RECENCY_FULL_HOURS) / (RECENCY_ZERO_HOURS - RECENCY_FULL_HOURS)
}

/// Fraction of interest keywords that appear in the event's title,
/// description or venue. Plain token matching, no NLU.
fn keyword_affinity(event: &Event, keywords: &[String]) -> f32 {
    let haystack = tokenize(&format!(
        "{} {} {}",
        event.title,
        event.description,
        event.venue_name.as_deref().unwrap_or_default()
    ));
    let matched = keywords.iter().filter(|k| haystack.contains(*k)).count();
    matched as f32 / keywords.len() as f32
}

fn interest_keywords(profile: &UserPreferenceProfile) -> Vec<String> {
    profile
        .free_text_interest
        .as_deref()
        .map(|t| {
            let mut kws: Vec<String> = tokenize(t).into_iter().collect();
            kws.sort();
            kws.dedup();
            kws
        })
        .unwrap_or_default()
}

fn tokenize(s: &str) -> std::collections::BTreeSet<String> {
    static RE_WORD: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_WORD.get_or_init(|| regex::Regex::new(r"(?u)\b\w+\b").unwrap());
    re.find_iter(&s.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}
