// src/analyze/mod.rs
//! Analysis building blocks: keyword matcher, per-signal scoring factors, and
//! rationale synthesis. The aggregator in `crate::engine` wires them together.

pub mod matcher;
pub mod rationale;
pub mod scoring;

use once_cell::sync::Lazy;

use crate::narrative::NarrativeMatch;
use crate::taxonomy::Taxonomy;

// Re-export convenient entry points.
pub use crate::analyze::matcher::classify_with;
pub use crate::analyze::rationale::why_now;
pub use crate::analyze::scoring::{age_hours, momentum_bonus, recency_multiplier};

/// Built-in taxonomy; read-only for the process lifetime.
pub static DEFAULT_TAXONOMY: Lazy<Taxonomy> = Lazy::new(Taxonomy::default);

/// Classify text against the built-in taxonomy.
pub fn classify(text: &str) -> Option<NarrativeMatch> {
    classify_with(text, &DEFAULT_TAXONOMY)
}
