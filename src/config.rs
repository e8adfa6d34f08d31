// src/config.rs
//! Pipeline configuration: TOML file with compiled-in defaults.
//!
//! Resolution order for the file: `$PIPELINE_CONFIG_PATH`, then
//! `config/pipeline.toml`, then defaults. Every knob the pipeline treats as
//! tunable lives here rather than as a hidden constant.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dedupe::{DedupeConfig, SimilarityStrategy};
use crate::ratelimit::RateLimitConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub events: EventsSection,
    #[serde(default)]
    pub dedupe: DedupeSection,
    #[serde(default)]
    pub aggregator: AggregatorSection,
    #[serde(default)]
    pub ratelimit: RateLimitSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsSection {
    /// Assumed duration when a feed omits `end_time`.
    #[serde(default = "default_duration_hours")]
    pub default_duration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupeSection {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_start_window_hours")]
    pub start_window_hours: i64,
    #[serde(default = "default_strategy")]
    pub strategy: SimilarityStrategy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorSection {
    /// Wall-clock ceiling for the whole source fan-out.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results_per_source: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_burst")]
    pub burst: u32,
    #[serde(default = "default_refill_secs")]
    pub refill_secs: u64,
}

fn default_duration_hours() -> i64 {
    3
}
fn default_similarity_threshold() -> f32 {
    0.8
}
fn default_start_window_hours() -> i64 {
    2
}
fn default_strategy() -> SimilarityStrategy {
    SimilarityStrategy::TokenOverlap
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_max_results() -> usize {
    50
}
fn default_burst() -> u32 {
    5
}
fn default_refill_secs() -> u64 {
    1
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            default_duration_hours: default_duration_hours(),
        }
    }
}

impl Default for DedupeSection {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            start_window_hours: default_start_window_hours(),
            strategy: default_strategy(),
        }
    }
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_results_per_source: default_max_results(),
        }
    }
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            burst: default_burst(),
            refill_secs: default_refill_secs(),
        }
    }
}

impl PipelineConfig {
    /// Load using `$PIPELINE_CONFIG_PATH` or the default path; a missing
    /// file yields the compiled-in defaults, a present-but-broken file is an
    /// error (a half-applied config is worse than none).
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::from_path(&PathBuf::from(p));
        }
        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::from_path(default);
        }
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config at {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config")?;
        cfg.dedupe.similarity_threshold = cfg.dedupe.similarity_threshold.clamp(0.0, 1.0);
        Ok(cfg)
    }

    pub fn dedupe_config(&self) -> DedupeConfig {
        DedupeConfig {
            similarity_threshold: self.dedupe.similarity_threshold,
            start_window_hours: self.dedupe.start_window_hours,
            strategy: self.dedupe.strategy,
        }
    }

    pub fn ratelimit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            burst: self.ratelimit.burst,
            refill_secs: self.ratelimit.refill_secs,
        }
    }

    pub fn default_event_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.events.default_duration_hours)
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.aggregator.fetch_timeout_secs)
    }
}
