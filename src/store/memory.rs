// src/store/memory.rs
//! In-memory signal + narrative store with optional JSON snapshot on disk.
//!
//! The snapshot is loaded once at construction. Narrative upserts and prunes
//! write it immediately; signal inserts are batched until `flush()`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    sync::{Mutex, RwLock},
};

use super::{NarrativeStore, SignalStore, StoreError, StoredNarrative};
use crate::narrative::ProcessedNarrative;
use crate::signal::{Signal, Source};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    signals: Vec<Signal>,
    #[serde(default)]
    narratives: Vec<StoredNarrative>,
}

fn key_of(s: &Signal) -> (Source, String) {
    let (source, id) = s.identity();
    (source, id.to_owned())
}

#[derive(Debug, Default)]
struct Inner {
    signals: Vec<Signal>,
    keys: HashSet<(Source, String)>,
    narratives: HashMap<String, StoredNarrative>,
}

impl Inner {
    fn from_snapshot(snap: Snapshot) -> Self {
        let mut inner = Inner::default();
        for s in snap.signals {
            if inner.keys.insert(key_of(&s)) {
                inner.signals.push(s);
            }
        }
        for n in snap.narratives {
            inner.narratives.insert(n.narrative_name.clone(), n);
        }
        inner
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut narratives: Vec<StoredNarrative> = self.narratives.values().cloned().collect();
        narratives.sort_by(|a, b| a.narrative_name.cmp(&b.narrative_name));
        Snapshot {
            signals: self.signals.clone(),
            narratives,
        }
    }

    fn rebuild_keys(&mut self) {
        self.keys = self.signals.iter().map(key_of).collect();
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    snapshot_path: Option<PathBuf>,
    /// Held across serialize, write and rename so the newest state lands last.
    flush_lock: Mutex<()>,
}

impl MemoryStore {
    /// Purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a JSON snapshot at `path`. A missing file starts empty.
    pub async fn with_snapshot<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = match fs::read(&path).await {
            Ok(bytes) => Inner::from_snapshot(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Inner::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            target: "store",
            path = %path.display(),
            signals = inner.signals.len(),
            narratives = inner.narratives.len(),
            "snapshot loaded"
        );
        Ok(Self {
            inner: RwLock::new(inner),
            snapshot_path: Some(path),
            flush_lock: Mutex::new(()),
        })
    }

    pub async fn signal_count(&self) -> usize {
        self.inner.read().await.signals.len()
    }

    /// Write the snapshot file (no-op without a snapshot path).
    pub async fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let _flushing = self.flush_lock.lock().await;
        let bytes = {
            let guard = self.inner.read().await;
            serde_json::to_vec_pretty(&guard.to_snapshot())?
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn insert(&self, signal: Signal) -> Result<bool, StoreError> {
        let mut guard = self.inner.write().await;
        if !guard.keys.insert(key_of(&signal)) {
            return Ok(false);
        }
        guard.signals.push(signal);
        Ok(true)
    }

    async fn read_recent(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Signal>, StoreError> {
        let guard = self.inner.read().await;
        let mut out: Vec<Signal> = guard
            .signals
            .iter()
            .filter(|s| s.timestamp > since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit);
        Ok(out)
    }

    async fn prune_signals(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
        max_per_source: usize,
    ) -> Result<usize, StoreError> {
        let removed = {
            let mut guard = self.inner.write().await;
            let before = guard.signals.len();
            let cutoff = now - retention;
            guard.signals.retain(|s| s.timestamp >= cutoff);

            // Newest first, then keep at most `max_per_source` of each source.
            guard.signals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            let mut seen: HashMap<Source, usize> = HashMap::new();
            guard.signals.retain(|s| {
                let c = seen.entry(s.source).or_default();
                *c += 1;
                *c <= max_per_source
            });

            guard.rebuild_keys();
            before - guard.signals.len()
        };
        self.flush().await?;
        Ok(removed)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        MemoryStore::flush(self).await
    }
}

#[async_trait]
impl NarrativeStore for MemoryStore {
    async fn upsert(
        &self,
        narrative: &ProcessedNarrative,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        {
            let mut guard = self.inner.write().await;
            guard.narratives.insert(
                narrative.narrative_name.clone(),
                StoredNarrative::from_processed(narrative, now),
            );
        }
        self.flush().await
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredNarrative>, StoreError> {
        let guard = self.inner.read().await;
        let mut out: Vec<StoredNarrative> = guard.narratives.values().cloned().collect();
        out.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.narrative_name.cmp(&b.narrative_name))
        });
        out.truncate(limit);
        Ok(out)
    }

    async fn get(&self, name: &str) -> Result<Option<StoredNarrative>, StoreError> {
        Ok(self.inner.read().await.narratives.get(name).cloned())
    }

    async fn prune_narratives(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<usize, StoreError> {
        let removed = {
            let mut guard = self.inner.write().await;
            let before = guard.narratives.len();
            let cutoff = now - retention;
            guard.narratives.retain(|_, n| n.updated_at >= cutoff);
            before - guard.narratives.len()
        };
        self.flush().await?;
        Ok(removed)
    }
}
