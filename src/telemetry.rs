use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_histogram!("engine_process_ms", "Engine run time in milliseconds.");
        describe_counter!("engine_runs_total", "Completed engine runs.");
        describe_counter!(
            "engine_signals_matched_total",
            "Signals that matched a narrative."
        );
        describe_gauge!(
            "engine_narratives_last_run",
            "Narratives emitted by the latest run."
        );
        describe_counter!("jobs_runs_total", "Successful job runs by job.");
        describe_counter!("jobs_failures_total", "Failed job runs by job.");
        describe_counter!(
            "jobs_skipped_total",
            "Ticks skipped because the job was still running."
        );
        describe_counter!("api_cache_hits_total", "Response cache hits.");
        describe_counter!("api_cache_misses_total", "Response cache misses.");
        describe_counter!(
            "api_cache_evictions_total",
            "Expired entries swept on insert."
        );
        describe_counter!("api_rate_limited_total", "Requests rejected with 429.");

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
