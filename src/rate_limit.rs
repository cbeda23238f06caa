//! # Rate limiter
//! Fixed one-window counter per client key.
//!
//! A key's window opens on its first request; requests beyond `max` inside
//! that window are rejected until it elapses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Keys tracked before stale windows are swept.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    inner: Mutex<HashMap<String, (Instant, u32)>>,
    max: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max,
            window,
        }
    }

    /// `max` requests per minute.
    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Count one request for `key`.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("rate limiter mutex poisoned");

        if map.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            map.retain(|_, (start, _)| now.duration_since(*start) < window);
        }

        let slot = map.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(slot.0) >= self.window {
            *slot = (now, 0);
        }

        if slot.1 >= self.max {
            let elapsed = now.duration_since(slot.0);
            return RateDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }
        slot.1 += 1;
        RateDecision::Allowed {
            remaining: self.max - slot.1,
        }
    }
}
