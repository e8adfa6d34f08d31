//! Typed error kinds for the pipeline.
//!
//! `ValidationError` is a caller bug and aborts the whole call. Everything a
//! source can do wrong is captured as a `SourceError` and reported through
//! the per-source status instead of propagating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bad caller input. Surfaces immediately; never produced by runtime
/// conditions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown category: {0:?}")]
    UnknownCategory(String),
    #[error("unknown accessibility flag: {0:?}")]
    UnknownAccessibilityFlag(String),
    #[error("time window is empty: from {from} must precede to {to}")]
    EmptyWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    #[error("budget_max must be non-negative, got {0}")]
    NegativeBudget(f32),
    #[error("page is 1-indexed, got 0")]
    PageOutOfRange,
    #[error("page_size must be >= 1, got 0")]
    PageSizeOutOfRange,
}

/// Classification of per-source failures. Drives retry and shows up verbatim
/// in the status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Network trouble, timeout, 5xx or 429. Retried once with backoff.
    Transient,
    /// 4xx (other than 429) or a payload that does not match the provider
    /// schema. Not retried.
    Permanent,
    /// The per-source token budget was empty; no network call was made.
    RateLimited,
    /// The adapter ran past the aggregate wall-clock deadline.
    TimedOut,
}

/// A failed fetch from one source.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} source error: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == SourceErrorKind::Transient
    }

    /// Classify a transport-level error from `reqwest`.
    pub fn from_http(err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::transient(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        Self::transient(err.to_string())
    }

    /// Classify an HTTP status: 5xx and 429 are worth a retry, other 4xx are
    /// not.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if status >= 500 || status == 429 {
            Self::transient(message)
        } else {
            Self::permanent(message)
        }
    }
}
