use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::aggregator::Aggregator;
use crate::error::ValidationError;
use crate::event::{Category, TimeWindow};
use crate::profile::RawProfile;
use crate::scoring::ScoredEvent;
use crate::source_priority::SourcePriorityConfig;
use crate::sources::AdapterStatus;
use crate::stats::{self, EventStats};

const SOURCE_PRIORITY_PATH: &str = "config/source_priority.json";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/aggregate", post(aggregate))
        .route("/categories", get(categories))
        .route("/sources", get(sources))
        .route("/stats", post(stats_batch))
        .route("/debug/source-priority", get(debug_source_priority))
        .route("/admin/reload-source-priority", post(admin_reload_source_priority))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct AggregateReq {
    #[serde(default)]
    profile: RawProfile,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

fn default_page() -> usize {
    1
}
fn default_page_size() -> usize {
    20
}

#[derive(serde::Serialize)]
struct AggregateResp {
    events: Vec<ScoredEvent>,
    total_count: usize,
    page: usize,
    page_size: usize,
    sources: Vec<AdapterStatus>,
}

/// Caller bugs come back as 422 with the message; nothing else escapes the
/// aggregator as an error.
fn unprocessable(e: ValidationError) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": e.to_string() })),
    )
}

async fn aggregate(
    State(state): State<AppState>,
    Json(req): Json<AggregateReq>,
) -> Result<Json<AggregateResp>, (StatusCode, Json<Value>)> {
    let now = Utc::now();

    let profile = req.profile.validate().map_err(unprocessable)?;
    let window = TimeWindow::new(req.from, req.to).map_err(unprocessable)?;

    let outcome = state
        .aggregator
        .aggregate(&profile, window, req.page, req.page_size, now)
        .await
        .map_err(unprocessable)?;

    Ok(Json(AggregateResp {
        events: outcome.page.events,
        total_count: outcome.page.total_count,
        page: outcome.page.page,
        page_size: outcome.page.page_size,
        sources: outcome.sources,
    }))
}

async fn categories() -> Json<Vec<&'static str>> {
    Json(Category::ALL.iter().map(Category::as_str).collect())
}

#[derive(serde::Serialize)]
struct SourceInfo {
    name: String,
    priority: f32,
}

async fn sources(State(state): State<AppState>) -> Json<Vec<SourceInfo>> {
    let priorities = state.aggregator.priorities();
    let guard = priorities.read().expect("rwlock poisoned");
    let out = state
        .aggregator
        .source_names()
        .into_iter()
        .map(|name| {
            let priority = guard.weight_for(&name);
            SourceInfo { name, priority }
        })
        .collect();
    Json(out)
}

#[derive(serde::Deserialize)]
struct StatsReq {
    #[serde(default)]
    profile: RawProfile,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

#[derive(serde::Serialize)]
struct StatsResp {
    stats: EventStats,
    sources: Vec<AdapterStatus>,
}

async fn stats_batch(
    State(state): State<AppState>,
    Json(req): Json<StatsReq>,
) -> Result<Json<StatsResp>, (StatusCode, Json<Value>)> {
    let now = Utc::now();
    let profile = req.profile.validate().map_err(unprocessable)?;
    let window = TimeWindow::new(req.from, req.to).map_err(unprocessable)?;

    let (scored, sources) = state.aggregator.collect(&profile, window, now).await;
    Ok(Json(StatsResp {
        stats: stats::summarize(&scored, now),
        sources,
    }))
}

async fn debug_source_priority(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> String {
    let s = q.get("source").cloned().unwrap_or_default();
    let w = {
        let priorities = state.aggregator.priorities();
        let g = priorities.read().expect("rwlock poisoned");
        g.weight_for(&s)
    };
    format!("source='{}' -> priority={:.2}", s, w)
}

async fn admin_reload_source_priority(State(state): State<AppState>) -> String {
    let fresh = SourcePriorityConfig::load_from_file(SOURCE_PRIORITY_PATH);
    let priorities = state.aggregator.priorities();
    let result = match priorities.write() {
        Ok(mut w) => {
            *w = fresh;
            "reloaded".to_string()
        }
        Err(_) => "failed: lock poisoned".to_string(),
    };
    result
}
