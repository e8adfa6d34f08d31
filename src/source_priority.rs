//! # Source Priority
//!
//! Configurable mapping from event sources (e.g. `nyc_open_data`,
//! `eventbrite`) to normalized trust/priority weights in `[0.0, 1.0]`.
//!
//! - Loads from JSON config (weights + aliases).
//! - Case-insensitive lookup with normalization of punctuation, dashes, etc.
//! - Aliases map alternative spellings to canonical source names.
//! - Fallback order: aliases → exact match → substring match → default.
//! - Includes a built-in `default_seed()` covering the configured sources.
//!
//! The deduplicator uses these weights to decide which of two records
//! describing the same real-world event survives: official/government feeds
//! outrank commercial ones, which outrank the static fallback set.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

/// Configuration for source priorities, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcePriorityConfig {
    /// Default weight if no match is found.
    #[serde(default = "default_default_weight")]
    pub default_weight: f32,
    /// Explicit weights for canonical source names.
    #[serde(default)]
    pub weights: HashMap<String, f32>,
    /// Aliases mapping non-canonical names → canonical names.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_default_weight() -> f32 {
    0.50
}

impl SourcePriorityConfig {
    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Get the priority weight for a given source name.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical → weight.
    /// 2. Exact weight match.
    /// 3. Substring fallback (e.g. "NYC Open Data portal" → "nyc open data").
    /// 4. Default weight.
    pub fn weight_for(&self, source: &str) -> f32 {
        let s = normalize(source);

        // 1) Alias resolution.
        if let Some(canon) = self.aliases.get(&s) {
            let c = normalize(canon);
            if let Some(&w) = self.weights.get(&c) {
                return clamp01(w);
            }
        }

        // 2) Exact weight match.
        if let Some(&w) = self.weights.get(&s) {
            return clamp01(w);
        }

        // 3) Substring fallback.
        for (k, &w) in &self.weights {
            if s.contains(k) {
                return clamp01(w);
            }
        }

        // 4) Default.
        clamp01(self.default_weight)
    }

    /// Built-in seed: official feeds above commercial ones, the static
    /// fallback set at the bottom. Used if no config file is found.
    pub(crate) fn default_seed() -> Self {
        let mut weights = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("nyc open data", 0.92),
            ("nyc parks", 0.88),
            ("eventbrite", 0.70),
            ("fallback", 0.10),
        ] {
            weights.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("socrata", "nyc open data"),
            ("data cityofnewyork us", "nyc open data"),
            ("open data", "nyc open data"),
            ("eventbrite com", "eventbrite"),
            ("eb", "eventbrite"),
            ("mock", "fallback"),
            ("static", "fallback"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_weight: 0.50,
            weights,
            aliases,
        }
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    // Replace common separators with spaces.
    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }

    // Replace disruptive punctuation/whitespace with spaces.
    out = out.replace(['\n', '\r', '\t', '.', ',', '\''], " ");

    // Collapse multiple spaces.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clamp to [0.0, 1.0].
fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}
