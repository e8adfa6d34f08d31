// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod api;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod event;
pub mod geo;
pub mod metrics;
pub mod profile;
pub mod ranking;
pub mod ratelimit;
pub mod scoring;
pub mod source_priority;
pub mod sources;
pub mod stats;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{AggregateOutcome, Aggregator};
pub use crate::api::{create_router, AppState};
pub use crate::error::{SourceError, SourceErrorKind, ValidationError};
pub use crate::event::{AccessibilityFlag, Category, Event, TimeWindow};
pub use crate::profile::{RawProfile, UserPreferenceProfile};
pub use crate::scoring::ScoredEvent;
pub use crate::sources::{AdapterStatus, EventSource, FetchBatch};
