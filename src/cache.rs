//! # Response cache
//! Absolute-TTL cache for rendered GET responses (no sliding refresh).
//!
//! Expired entries are dropped lazily on lookup, and in bulk on insert once
//! the map reaches `SWEEP_THRESHOLD` keys.

use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Keys held before an insert sweeps expired entries.
const SWEEP_THRESHOLD: usize = 256;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<HashMap<String, Entry<V>>>,
    ttl: Duration,
    /// Metric label.
    name: &'static str,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        gauge!("api_cache_ttl_ms", "cache" => name).set(ttl.as_millis() as f64);
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
            name,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        let fresh = match map.get(key) {
            Some(e) if now.duration_since(e.stored_at) <= self.ttl => Some(e.value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        };
        match fresh {
            Some(_) => counter!("api_cache_hits_total", "cache" => self.name).increment(1),
            None => counter!("api_cache_misses_total", "cache" => self.name).increment(1),
        }
        fresh
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        if map.len() >= SWEEP_THRESHOLD {
            let evicted = Self::evict_expired(&mut map, now, self.ttl);
            counter!("api_cache_evictions_total", "cache" => self.name).increment(evicted as u64);
        }
        map.insert(
            key.into(),
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    fn evict_expired(map: &mut HashMap<String, Entry<V>>, now: Instant, ttl: Duration) -> usize {
        let before = map.len();
        map.retain(|_, e| now.duration_since(e.stored_at) <= ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
