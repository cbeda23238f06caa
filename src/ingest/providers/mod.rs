// src/ingest/providers/mod.rs
pub mod dune;
pub mod farcaster;
pub mod github;
pub mod rss;

use metrics::{counter, histogram};
use std::time::Instant;

pub use dune::DuneProvider;
pub use farcaster::FarcasterProvider;
pub use github::GithubProvider;
pub use rss::RssProvider;

/// Per-request timeout for upstream HTTP calls.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("narrative-engine/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(target: "ingest", error = %e, "http client builder failed, using defaults");
            reqwest::Client::new()
        })
}

/// Parse timing and item count for one upstream body.
pub(crate) fn record_parse(t0: Instant, items: usize) {
    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("ingest_events_total").increment(items as u64);
}
