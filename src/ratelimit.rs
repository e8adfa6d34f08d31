//! # Rate Limiter
//! Injectable per-source token bucket. One token is spent per upstream fetch;
//! tokens refill at a fixed interval up to the burst cap.
//!
//! The whole check-then-consume is a single operation under one mutex, so two
//! concurrent aggregations can never both spend the last token. Time is an
//! explicit argument; the limiter itself never reads the clock.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum tokens a source can accumulate.
    pub burst: u32,
    /// One token refills per this many seconds.
    pub refill_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 5,
            refill_secs: 1,
        }
    }
}

/// Thread-safe token buckets keyed by source name.
#[derive(Debug)]
pub struct RateLimiter {
    cfg: RateLimitConfig,
    inner: Mutex<HashMap<String, Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: DateTime<Utc>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `source` if available. Refills lazily from elapsed
    /// time before deciding. Returns `false` when the budget is exhausted.
    pub fn try_acquire(&self, source: &str, now: DateTime<Utc>) -> bool {
        let mut map = self.inner.lock().expect("rate limiter mutex poisoned");
        let cfg = self.cfg;

        let bucket = map.entry(source.to_string()).or_insert(Bucket {
            tokens: cfg.burst,
            last_refill: now,
        });

        if cfg.refill_secs > 0 {
            let elapsed = (now - bucket.last_refill).num_seconds().max(0) as u64;
            let refilled = (elapsed / cfg.refill_secs) as u32;
            if refilled > 0 {
                bucket.tokens = bucket.tokens.saturating_add(refilled).min(cfg.burst);
                bucket.last_refill +=
                    chrono::Duration::seconds((refilled as u64 * cfg.refill_secs) as i64);
            }
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Remaining tokens for a source (diagnostics only).
    pub fn remaining(&self, source: &str) -> Option<u32> {
        let map = self.inner.lock().expect("rate limiter mutex poisoned");
        map.get(source).map(|b| b.tokens)
    }
}
