//! Narrative Engine Service: binary entrypoint
//! Boots the Axum HTTP server, wiring store, engine, job scheduler and routes.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use narrative_engine::api::{self, AppState};
use narrative_engine::config::AppConfig;
use narrative_engine::engine::Engine;
use narrative_engine::jobs::{spawn_scheduler, JobBoard, JobContext};
use narrative_engine::store::{MemoryStore, Store};
use narrative_engine::telemetry::Metrics;

/// Compact logs by default, JSON lines with `LOG_FORMAT=json`.
/// The runtime may already have installed a subscriber; then this is a no-op.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("narrative_engine=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match &cfg.store_path {
        Some(path) => Arc::new(
            MemoryStore::with_snapshot(path)
                .await
                .with_context(|| format!("opening store snapshot {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };
    let engine = Arc::new(Engine::default());
    let jobs = Arc::new(JobBoard::new());

    if cfg.scheduler_enabled {
        let ctx = JobContext::from_config(&cfg, store.clone(), engine.clone());
        let handles = spawn_scheduler(Arc::new(ctx), jobs.clone());
        tracing::info!(target: "jobs", jobs = handles.len(), "scheduler started");
    } else {
        tracing::info!(target: "jobs", "scheduler disabled");
    }

    let state = AppState::new(store, engine, jobs, &cfg);
    let mut router = api::router(state);

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics exporter not installed"),
    }

    tracing::info!(
        feeds = cfg.rss_feeds.len(),
        dune = cfg.dune_api_key.is_some(),
        "narrative engine ready"
    );
    Ok(router.into())
}
