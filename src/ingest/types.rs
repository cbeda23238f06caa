// src/ingest/types.rs
use anyhow::Result;
use serde::Serialize;

use crate::signal::{Signal, Source};

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Latest items from the upstream, already shaped as signals.
    async fn fetch_latest(&self) -> Result<Vec<Signal>>;
    fn source(&self) -> Source;
    fn name(&self) -> &'static str;
}

/// Outcome of one ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Empty after normalization.
    pub dropped: usize,
    pub provider_errors: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.fetched += other.fetched;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.dropped += other.dropped;
        self.provider_errors += other.provider_errors;
    }
}
