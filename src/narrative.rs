//! narrative.rs: output shapes of the engine (match, score, processed narrative).
//!
//! `ProcessedNarrative` is what the API returns and what the narrative store
//! persists (keyed by `narrative_name`, last write wins).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::{Signal, Source};

/// Best-fitting narrative for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeMatch {
    pub narrative_name: String,
    /// Normalized match quality in `[0.0, 1.0]`.
    pub strength: f64,
    pub matched_keywords: Vec<String>,
    /// Un-normalized keyword score (primary ×2, secondary ×1).
    pub raw_score: f64,
}

/// A matched signal plus its per-signal scoring factors.
/// Lives only for one aggregation run.
#[derive(Debug, Clone)]
pub struct ScoredSignal<'a> {
    pub signal: &'a Signal,
    pub matched: NarrativeMatch,
    pub source_weight: f64,
    pub recency_multiplier: f64,
    pub momentum_bonus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Strong,
    Emerging,
    Weak,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Strong => "strong",
            Confidence::Emerging => "emerging",
            Confidence::Weak => "weak",
        }
    }

    /// Prefix used by the `why_now` rationale.
    pub fn label(&self) -> &'static str {
        match self {
            Confidence::Strong => "Strong signal:",
            Confidence::Emerging => "Emerging pattern:",
            Confidence::Weak => "Weak signal:",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduced score of one narrative bucket. Components are rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeScore {
    pub base_score: f64,
    pub momentum_score: f64,
    pub diversity_score: f64,
    pub penalty_score: f64,
    pub final_score: f64,
    pub confidence: Confidence,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: Source,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedNarrative {
    pub narrative_name: String,
    pub score: f64,
    pub confidence: Confidence,
    pub why_now: String,
    pub evidence: Vec<Evidence>,
}

/// Round half away from zero to two decimals.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
