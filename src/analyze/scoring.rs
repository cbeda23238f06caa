//! Per-signal scoring factors.
//!
//! - `recency_multiplier`: step decay by signal age in hours.
//! - `momentum_bonus`    : bucket-level spike bonus over a lookback window.
//!
//! Both take an explicit `now` so a run is reproducible for a frozen clock.

use chrono::{DateTime, Utc};

use crate::signal::Signal;
use crate::taxonomy::ScoringConfig;

/// Age of `ts` relative to `now` in fractional hours. Future timestamps count as 0.
pub fn age_hours(ts: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let ms = (now - ts).num_milliseconds().max(0);
    ms as f64 / 3_600_000.0
}

/// ≤6h → 1.0, ≤12h → 0.8, ≤24h → 0.6, ≤48h → 0.4, older → 0.2.
pub fn recency_multiplier(ts: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = age_hours(ts, now);
    if hours <= 6.0 {
        1.0
    } else if hours <= 12.0 {
        0.8
    } else if hours <= 24.0 {
        0.6
    } else if hours <= 48.0 {
        0.4
    } else {
        0.2
    }
}

/// Spike bonus for a set of signals belonging to one narrative.
///
/// `recent` = signals within the lookback window, `older` = the rest.
/// Bonus is `recent × multiplier` when `recent > older × threshold` and
/// `recent ≥ min_momentum_signals`; otherwise 0.
pub fn momentum_bonus<'a, I>(signals: I, now: DateTime<Utc>, cfg: &ScoringConfig) -> f64
where
    I: IntoIterator<Item = &'a Signal>,
{
    let (mut recent, mut older) = (0usize, 0usize);
    for s in signals {
        if age_hours(s.timestamp, now) <= cfg.momentum_window_hours {
            recent += 1;
        } else {
            older += 1;
        }
    }

    if recent as f64 > older as f64 * cfg.momentum_threshold && recent >= cfg.min_momentum_signals
    {
        recent as f64 * cfg.momentum_multiplier
    } else {
        0.0
    }
}
