//! Duplicate collapse across sources.
//!
//! Two records are the same real-world event when their normalized titles are
//! similar enough, their venues match and their start times fall within a
//! small window. Matching is a swappable strategy behind `is_duplicate`.
//!
//! Duplicates are clustered transitively and one survivor is kept per
//! cluster: highest source priority, then the more complete record, then the
//! lexicographically smaller id. The input is sorted internally, so the
//! surviving id set does not depend on input order, and a second pass is a
//! no-op.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::event::Event;
use crate::event::normalize_place;
use crate::source_priority::SourcePriorityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityStrategy {
    /// Jaccard ratio over normalized title tokens (default).
    TokenOverlap,
    /// `strsim` normalized Levenshtein over the normalized titles.
    Levenshtein,
}

#[derive(Debug, Clone, Copy)]
pub struct DedupeConfig {
    pub similarity_threshold: f32,
    pub start_window_hours: i64,
    pub strategy: SimilarityStrategy,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            start_window_hours: 2,
            strategy: SimilarityStrategy::TokenOverlap,
        }
    }
}

/// Case/punctuation-insensitive title tokens.
fn title_tokens(title: &str) -> BTreeSet<String> {
    static RE_WORD: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re = RE_WORD.get_or_init(|| regex::Regex::new(r"(?u)\b\w+\b").unwrap());
    re.find_iter(&title.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn title_similarity(a: &str, b: &str, strategy: SimilarityStrategy) -> f32 {
    match strategy {
        SimilarityStrategy::TokenOverlap => {
            let ta = title_tokens(a);
            let tb = title_tokens(b);
            if ta.is_empty() && tb.is_empty() {
                return 1.0;
            }
            let inter = ta.intersection(&tb).count() as f32;
            let union = ta.union(&tb).count() as f32;
            if union == 0.0 {
                0.0
            } else {
                inter / union
            }
        }
        SimilarityStrategy::Levenshtein => {
            strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) as f32
        }
    }
}

/// The duplicate predicate. Id equality short-circuits: the same
/// source-qualified id is the same event by definition.
pub fn is_duplicate(a: &Event, b: &Event, cfg: &DedupeConfig) -> bool {
    if a.id == b.id {
        return true;
    }
    if normalize_place(a.venue_name.as_deref().unwrap_or_default())
        != normalize_place(b.venue_name.as_deref().unwrap_or_default())
    {
        return false;
    }
    let gap = (a.start_time - b.start_time).num_minutes().abs();
    if gap > cfg.start_window_hours * 60 {
        return false;
    }
    title_similarity(&a.title, &b.title, cfg.strategy) >= cfg.similarity_threshold
}

/// Collapse duplicates, keeping one survivor per transitive duplicate
/// cluster.
pub fn dedupe(
    mut events: Vec<Event>,
    cfg: &DedupeConfig,
    priorities: &SourcePriorityConfig,
) -> Vec<Event> {
    // Canonical scan order: makes the result independent of input order.
    events.sort_by(|a, b| a.id.cmp(&b.id));

    let n = events.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = i;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if is_duplicate(&events[i], &events[j], cfg) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    // Pick the best index per cluster.
    let mut best: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let root = find(&mut parent, i);
        best[root] = Some(match best[root] {
            None => i,
            Some(cur) => {
                if prefer(&events[i], &events[cur], priorities) {
                    i
                } else {
                    cur
                }
            }
        });
    }

    let keep: BTreeSet<usize> = best.into_iter().flatten().collect();
    events
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, e)| e)
        .collect()
}

/// `true` when `candidate` should survive over `incumbent`.
fn prefer(candidate: &Event, incumbent: &Event, priorities: &SourcePriorityConfig) -> bool {
    let wc = priorities.weight_for(&candidate.source);
    let wi = priorities.weight_for(&incumbent.source);
    if (wc - wi).abs() > f32::EPSILON {
        return wc > wi;
    }
    let (cc, ci) = (candidate.completeness(), incumbent.completeness());
    if cc != ci {
        return cc > ci;
    }
    candidate.id < incumbent.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeSet as Set;

    fn ev(id: &str, source: &str, title: &str, venue: &str, minute: i64) -> Event {
        Event {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: crate::event::Category::Music,
            start_time: Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap()
                + Duration::minutes(minute),
            end_time: None,
            venue_name: Some(venue.to_string()),
            neighborhood: None,
            borough: None,
            latitude: None,
            longitude: None,
            price_min: None,
            price_max: None,
            accessibility_flags: Set::new(),
            source: source.to_string(),
            source_url: None,
            raw_hash: String::new(),
        }
        .sealed()
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn higher_priority_source_survives() {
        // "Jazz Night" @ Blue Note from the official feed vs "jazz night!"
        // thirty minutes later from the commercial feed.
        let a = ev("nyc_open_data:1", "nyc_open_data", "Jazz Night", "Blue Note", 0);
        let b = ev("eventbrite:9", "eventbrite", "jazz night!", "Blue Note", 30);
        let cfg = DedupeConfig::default();
        let pri = SourcePriorityConfig::default_seed();

        let out = dedupe(vec![b.clone(), a.clone()], &cfg, &pri);
        assert_eq!(ids(&out), vec!["nyc_open_data:1"]);
    }

    #[test]
    fn different_venue_is_not_a_duplicate() {
        let a = ev("a", "eventbrite", "Jazz Night", "Blue Note", 0);
        let b = ev("b", "eventbrite", "Jazz Night", "Smalls", 0);
        let out = dedupe(
            vec![a, b],
            &DedupeConfig::default(),
            &SourcePriorityConfig::default_seed(),
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn far_apart_start_times_are_not_duplicates() {
        let a = ev("a", "eventbrite", "Jazz Night", "Blue Note", 0);
        let b = ev("b", "eventbrite", "Jazz Night", "Blue Note", 150);
        let out = dedupe(
            vec![a, b],
            &DedupeConfig::default(),
            &SourcePriorityConfig::default_seed(),
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn completeness_breaks_same_source_ties() {
        let sparse = ev("z-sparse", "eventbrite", "Open Mic", "Cafe Wha", 0);
        let mut rich = ev("a-rich", "eventbrite", "Open Mic!", "Cafe Wha", 10);
        rich.price_min = Some(10.0);
        rich.price_max = Some(10.0);
        rich.borough = Some("Manhattan".into());
        let rich = rich.sealed();

        let out = dedupe(
            vec![sparse, rich],
            &DedupeConfig::default(),
            &SourcePriorityConfig::default_seed(),
        );
        assert_eq!(ids(&out), vec!["a-rich"]);
    }

    #[test]
    fn smaller_id_breaks_full_ties() {
        let a = ev("eventbrite:100", "eventbrite", "Open Mic", "Cafe Wha", 0);
        let b = ev("eventbrite:200", "eventbrite", "Open Mic", "Cafe Wha", 0);
        let out = dedupe(
            vec![b, a],
            &DedupeConfig::default(),
            &SourcePriorityConfig::default_seed(),
        );
        assert_eq!(ids(&out), vec!["eventbrite:100"]);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let events = vec![
            ev("nyc_open_data:1", "nyc_open_data", "Jazz Night", "Blue Note", 0),
            ev("eventbrite:2", "eventbrite", "jazz night!", "Blue Note", 30),
            ev("eventbrite:3", "eventbrite", "Jazz Night Late Set", "Blue Note", 60),
            ev("fallback:4", "fallback", "Poetry Slam", "Nuyorican", 0),
        ];
        let cfg = DedupeConfig::default();
        let pri = SourcePriorityConfig::default_seed();

        let once = dedupe(events, &cfg, &pri);
        let twice = dedupe(once.clone(), &cfg, &pri);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn result_is_order_independent() {
        let events = vec![
            ev("nyc_open_data:1", "nyc_open_data", "Jazz Night", "Blue Note", 0),
            ev("eventbrite:2", "eventbrite", "jazz night!", "Blue Note", 30),
            ev("fallback:3", "fallback", "Jazz Night", "Blue Note", 45),
            ev("eventbrite:4", "eventbrite", "Salsa Social", "SOB's", 0),
        ];
        let cfg = DedupeConfig::default();
        let pri = SourcePriorityConfig::default_seed();

        let forward: Set<String> = dedupe(events.clone(), &cfg, &pri)
            .into_iter()
            .map(|e| e.id)
            .collect();
        let mut reversed_input = events;
        reversed_input.reverse();
        let reversed: Set<String> = dedupe(reversed_input, &cfg, &pri)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn levenshtein_strategy_is_swappable() {
        let cfg = DedupeConfig {
            strategy: SimilarityStrategy::Levenshtein,
            similarity_threshold: 0.85,
            start_window_hours: 2,
        };
        let a = ev("a", "eventbrite", "Jazz Night", "Blue Note", 0);
        let b = ev("b", "eventbrite", "Jazz Nighte", "Blue Note", 10);
        assert!(is_duplicate(&a, &b, &cfg));
    }

    #[test]
    fn token_overlap_handles_punctuation_and_case() {
        let cfg = DedupeConfig::default();
        assert!(title_similarity("Jazz Night", "jazz night!", cfg.strategy) >= 0.99);
        assert!(title_similarity("Jazz Night", "Wine Tasting", cfg.strategy) < 0.2);
    }
}
