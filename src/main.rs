//! NYC Event Aggregator - Binary Entrypoint
//! Boots the Axum HTTP server, wiring sources, shared state, and middleware.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nyc_event_aggregator::aggregator::Aggregator;
use nyc_event_aggregator::api::{create_router, AppState};
use nyc_event_aggregator::config::PipelineConfig;
use nyc_event_aggregator::metrics::Metrics;
use nyc_event_aggregator::source_priority::SourcePriorityConfig;
use nyc_event_aggregator::sources::{eventbrite::EventbriteSource, nyc_open_data::NycOpenDataSource, EventSource};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::load()?;

    // NYC Open Data is free and unauthenticated, so it is always on.
    // Eventbrite joins the pool only when a token is configured.
    let mut sources: Vec<Arc<dyn EventSource>> = vec![Arc::new(NycOpenDataSource::live())];
    match std::env::var("EVENTBRITE_API_KEY") {
        Ok(token) if !token.trim().is_empty() => {
            sources.push(Arc::new(EventbriteSource::live(token)));
        }
        _ => tracing::warn!("EVENTBRITE_API_KEY not set; running without the Eventbrite source"),
    }
    tracing::info!(sources = sources.len(), "configured event sources");

    let priorities = SourcePriorityConfig::load_from_file("config/source_priority.json");
    let metrics = Metrics::init();
    let aggregator = Arc::new(Aggregator::new(cfg, sources, priorities));

    let app = create_router(AppState { aggregator }).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(%port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
