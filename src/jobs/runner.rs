// src/jobs/runner.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{JobBoard, JobKind};
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::ingest::providers::{DuneProvider, FarcasterProvider, GithubProvider, RssProvider};
use crate::ingest::{self, types::IngestReport, types::SourceProvider};
use crate::store::{cleanup_old_data, persist_narratives, PruneReport, SignalStore, Store};
use crate::taxonomy::{DEFAULT_ROW_CAP, DEFAULT_WINDOW_HOURS, MAX_NARRATIVES_TO_PERSIST};

/// Everything a job needs; shared by the scheduler tasks.
pub struct JobContext {
    pub store: Arc<dyn Store>,
    pub engine: Arc<Engine>,
    /// Providers per ingest job. Missing kinds ingest nothing.
    pub providers: BTreeMap<JobKind, Vec<Box<dyn SourceProvider>>>,
}

impl JobContext {
    pub fn new(store: Arc<dyn Store>, engine: Arc<Engine>) -> Self {
        Self {
            store,
            engine,
            providers: BTreeMap::new(),
        }
    }

    /// Live HTTP providers for every ingest job.
    pub fn from_config(cfg: &AppConfig, store: Arc<dyn Store>, engine: Arc<Engine>) -> Self {
        let dune = DuneProvider::new(&cfg.dune_api_url, cfg.dune_api_key.clone(), cfg.dune_query_id);
        if !dune.is_enabled() {
            tracing::warn!(target: "jobs", "DUNE_API_KEY not set, dune job will ingest nothing");
        }
        Self::new(store, engine)
            .with_provider(
                JobKind::Farcaster,
                Box::new(FarcasterProvider::from_url(&cfg.farcaster_hub_url)),
            )
            .with_provider(
                JobKind::Rss,
                Box::new(RssProvider::from_feeds(cfg.rss_feeds.clone())),
            )
            .with_provider(
                JobKind::Github,
                Box::new(GithubProvider::from_url(&cfg.github_api_url)),
            )
            .with_provider(JobKind::Dune, Box::new(dune))
    }

    pub fn with_provider(mut self, kind: JobKind, provider: Box<dyn SourceProvider>) -> Self {
        self.providers.entry(kind).or_default().push(provider);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NarrativeRunReport {
    pub signals_read: usize,
    pub narratives: usize,
    pub persisted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "job", rename_all = "lowercase")]
pub enum JobOutcome {
    Ingest(IngestReport),
    Narratives(NarrativeRunReport),
    Cleanup(PruneReport),
}

/// Read the recent window, run the engine, persist the top narratives.
pub async fn run_narratives(
    store: &dyn Store,
    engine: &Engine,
    now: DateTime<Utc>,
) -> Result<NarrativeRunReport> {
    let since = now - Duration::hours(DEFAULT_WINDOW_HOURS);
    let signals = store
        .read_recent(since, DEFAULT_ROW_CAP)
        .await
        .context("reading recent signals")?;

    let processed = engine.process_at(&signals, now);
    let top = &processed[..processed.len().min(MAX_NARRATIVES_TO_PERSIST)];
    let persisted = persist_narratives(store, top, now).await;

    Ok(NarrativeRunReport {
        signals_read: signals.len(),
        narratives: processed.len(),
        persisted: persisted.persisted,
        failed: persisted.failed,
    })
}

async fn execute(ctx: &JobContext, kind: JobKind, now: DateTime<Utc>) -> Result<JobOutcome> {
    match kind {
        JobKind::Farcaster | JobKind::Rss | JobKind::Github | JobKind::Dune => {
            let providers = ctx.providers.get(&kind).map(Vec::as_slice).unwrap_or_default();
            let report = ingest::run_once(providers, ctx.store.as_ref(), now).await;
            if !providers.is_empty() && report.provider_errors >= providers.len() && report.fetched == 0 {
                anyhow::bail!("every {} provider failed", kind.as_str());
            }
            Ok(JobOutcome::Ingest(report))
        }
        JobKind::Narratives => Ok(JobOutcome::Narratives(
            run_narratives(ctx.store.as_ref(), &ctx.engine, now).await?,
        )),
        JobKind::Cleanup => Ok(JobOutcome::Cleanup(
            cleanup_old_data(ctx.store.as_ref(), now).await?,
        )),
    }
}

/// Run one job under the board's guard.
///
/// Returns `None` when the job is already running (the tick is skipped).
pub async fn run_job(
    ctx: &JobContext,
    board: &JobBoard,
    kind: JobKind,
    now: DateTime<Utc>,
) -> Option<Result<JobOutcome>> {
    if !board.try_start(kind) {
        tracing::debug!(target: "jobs", job = kind.as_str(), "already running, tick skipped");
        counter!("jobs_skipped_total", "job" => kind.as_str()).increment(1);
        return None;
    }

    let t0 = std::time::Instant::now();
    let result = execute(ctx, kind, now).await;
    histogram!("jobs_duration_ms", "job" => kind.as_str()).record(t0.elapsed().as_secs_f64() * 1_000.0);

    match &result {
        Ok(outcome) => {
            counter!("jobs_runs_total", "job" => kind.as_str()).increment(1);
            tracing::info!(target: "jobs", job = kind.as_str(), outcome = ?outcome, "job finished");
            board.finish(kind, Ok(()), now);
        }
        Err(e) => {
            counter!("jobs_failures_total", "job" => kind.as_str()).increment(1);
            tracing::error!(target: "jobs", job = kind.as_str(), error = ?e, "job failed");
            board.finish(kind, Err(format!("{e:#}")), now);
        }
    }
    Some(result)
}
