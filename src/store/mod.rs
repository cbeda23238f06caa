// src/store/mod.rs
//! Storage boundary: signal store (append-only, dedup by source + external id)
//! and narrative store (snapshot keyed by narrative name, last write wins).

pub mod memory;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::narrative::{Confidence, Evidence, ProcessedNarrative};
use crate::signal::Signal;

pub use memory::MemoryStore;

/// Signals older than this are pruned.
pub const SIGNAL_RETENTION_DAYS: i64 = 7;
/// Narratives not refreshed within this window are pruned.
pub const NARRATIVE_RETENTION_DAYS: i64 = 14;
/// Newest signals kept per source.
pub const MAX_SIGNALS_PER_SOURCE: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persisted narrative snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNarrative {
    pub narrative_name: String,
    pub score: f64,
    pub confidence: Confidence,
    pub why_now: String,
    pub evidence: Vec<Evidence>,
    pub updated_at: DateTime<Utc>,
}

impl StoredNarrative {
    pub fn from_processed(n: &ProcessedNarrative, now: DateTime<Utc>) -> Self {
        Self {
            narrative_name: n.narrative_name.clone(),
            score: n.score,
            confidence: n.confidence,
            why_now: n.why_now.clone(),
            evidence: n.evidence.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub signals_removed: usize,
    pub narratives_removed: usize,
}

#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Insert unless `(source, external_id)` already exists. Returns `true` if inserted.
    async fn insert(&self, signal: Signal) -> Result<bool, StoreError>;

    /// Signals with `timestamp > since`, newest first, at most `limit`.
    async fn read_recent(&self, since: DateTime<Utc>, limit: usize)
        -> Result<Vec<Signal>, StoreError>;

    /// Drop signals older than `retention` and all but the newest `max_per_source` per source.
    async fn prune_signals(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
        max_per_source: usize,
    ) -> Result<usize, StoreError>;

    /// Make buffered inserts durable. Stores without buffering keep the default.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Insert if absent, else overwrite every field and refresh `updated_at`.
    async fn upsert(&self, narrative: &ProcessedNarrative, now: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Narratives by score descending, at most `limit`.
    async fn list(&self, limit: usize) -> Result<Vec<StoredNarrative>, StoreError>;

    async fn get(&self, name: &str) -> Result<Option<StoredNarrative>, StoreError>;

    /// Drop narratives whose `updated_at` is older than `retention`.
    async fn prune_narratives(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<usize, StoreError>;
}

/// Both stores behind one object, for `Arc<dyn Store>` sharing.
pub trait Store: SignalStore + NarrativeStore {}
impl<T: SignalStore + NarrativeStore + ?Sized> Store for T {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub persisted: usize,
    pub failed: usize,
}

/// Upsert each narrative independently. A failing upsert is logged and
/// counted; it never aborts the remaining ones.
pub async fn persist_narratives<S: NarrativeStore + ?Sized>(
    store: &S,
    narratives: &[ProcessedNarrative],
    now: DateTime<Utc>,
) -> PersistReport {
    let mut report = PersistReport::default();
    for n in narratives {
        match store.upsert(n, now).await {
            Ok(()) => report.persisted += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    target: "store",
                    narrative = %n.narrative_name,
                    error = %e,
                    "narrative upsert failed"
                );
            }
        }
    }

    counter!("store_narrative_upserts_total").increment(report.persisted as u64);
    if report.failed > 0 {
        counter!("store_narrative_upsert_failures_total").increment(report.failed as u64);
        tracing::error!(
            target: "store",
            failed = report.failed,
            total = narratives.len(),
            "some narratives failed to persist"
        );
    }
    report
}

/// Apply the default retention policy to both stores.
pub async fn cleanup_old_data<S>(store: &S, now: DateTime<Utc>) -> AnyResult<PruneReport>
where
    S: SignalStore + NarrativeStore + ?Sized,
{
    let signals_removed = store
        .prune_signals(
            now,
            Duration::days(SIGNAL_RETENTION_DAYS),
            MAX_SIGNALS_PER_SOURCE,
        )
        .await?;
    let narratives_removed = store
        .prune_narratives(now, Duration::days(NARRATIVE_RETENTION_DAYS))
        .await?;

    tracing::info!(
        target: "store",
        signals_removed,
        narratives_removed,
        "retention cleanup done"
    );
    Ok(PruneReport {
        signals_removed,
        narratives_removed,
    })
}
