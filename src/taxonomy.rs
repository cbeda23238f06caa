//! # Taxonomy
//! Fixed narrative definitions plus the scoring constants the engine runs on.
//!
//! Everything here is process-wide constant; there is no runtime editing.

use serde::Serialize;

/// One narrative and the keywords that identify it. Keywords are lowercase.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NarrativeDefinition {
    pub name: &'static str,
    pub primary_keywords: &'static [&'static str],
    pub secondary_keywords: &'static [&'static str],
}

impl NarrativeDefinition {
    /// Highest raw keyword score this definition can produce.
    pub fn max_possible(&self, cfg: &ScoringConfig) -> f64 {
        self.primary_keywords.len() as f64 * cfg.primary_keyword_weight
            + self.secondary_keywords.len() as f64 * cfg.secondary_keyword_weight
    }
}

/// Taxonomy order matters: it is the matcher's tie-break.
pub const NARRATIVE_DEFINITIONS: &[NarrativeDefinition] = &[
    NarrativeDefinition {
        name: "Layer 2 Scaling",
        primary_keywords: &["layer 2", "l2", "rollup", "arbitrum", "optimism", "base"],
        secondary_keywords: &["scaling", "throughput", "gas fees", "transaction cost"],
    },
    NarrativeDefinition {
        name: "AI Agents",
        primary_keywords: &["ai agent", "agents", "autonomous agent", "multi-agent"],
        secondary_keywords: &["automation", "llm", "chatbot", "artificial intelligence"],
    },
    NarrativeDefinition {
        name: "DeFi Revival",
        primary_keywords: &["defi", "dex", "liquidity", "yield farming", "amm"],
        secondary_keywords: &["uniswap", "trading volume", "tvl", "protocol revenue"],
    },
    NarrativeDefinition {
        name: "Restaking",
        primary_keywords: &["restaking", "eigenlayer", "avs", "actively validated"],
        secondary_keywords: &["staking yield", "validator", "ethereum staking"],
    },
    NarrativeDefinition {
        name: "Farcaster Apps",
        primary_keywords: &["farcaster", "warpcast", "frames", "farcaster protocol"],
        secondary_keywords: &["social protocol", "decentralized social", "onchain social"],
    },
];

/// How per-signal momentum is derived from a narrative bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumMode {
    /// Computed once over the fully assembled bucket; independent of input order.
    #[default]
    PerBucket,
    /// Recomputed over the bucket-so-far on every insertion (legacy scores).
    Incremental,
}

/// Scoring weights and thresholds.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoringConfig {
    pub primary_keyword_weight: f64,
    pub secondary_keyword_weight: f64,
    pub min_keyword_strength: f64,

    pub max_diversity_multiplier: f64,
    pub diversity_step: f64,

    pub single_source_penalty: f64,
    pub weak_keyword_penalty: f64,
    pub weak_keyword_threshold: f64,

    pub momentum_multiplier: f64,
    pub momentum_threshold: f64,
    pub min_momentum_signals: usize,
    pub momentum_window_hours: f64,
    pub momentum_mode: MomentumMode,

    pub evidence_cap: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            primary_keyword_weight: 2.0,
            secondary_keyword_weight: 1.0,
            min_keyword_strength: 0.1,
            max_diversity_multiplier: 2.0,
            diversity_step: 0.5,
            single_source_penalty: 0.5,
            weak_keyword_penalty: 0.3,
            weak_keyword_threshold: 0.3,
            momentum_multiplier: 2.0,
            momentum_threshold: 1.5,
            min_momentum_signals: 2,
            momentum_window_hours: 6.0,
            momentum_mode: MomentumMode::PerBucket,
            evidence_cap: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConfidenceThresholds {
    pub strong_score: f64,
    pub strong_sources: usize,
    pub strong_strength: f64,
    pub emerging_score: f64,
    pub emerging_sources: usize,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            strong_score: 15.0,
            strong_sources: 3,
            strong_strength: 0.4,
            emerging_score: 8.0,
            emerging_sources: 2,
        }
    }
}

/// Post-hoc drop rules applied to each reduced narrative.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QualityFilter {
    pub single_source_min_score: f64,
    pub weak_min_score: f64,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            single_source_min_score: 3.0,
            weak_min_score: 1.5,
        }
    }
}

/// Processing window for a scheduled run.
pub const DEFAULT_WINDOW_HOURS: i64 = 48;
pub const DEFAULT_ROW_CAP: usize = 1000;
/// Narratives persisted per scheduled run.
pub const MAX_NARRATIVES_TO_PERSIST: usize = 10;

/// The taxonomy plus every tunable the engine reads.
#[derive(Debug, Clone, Serialize)]
pub struct Taxonomy {
    pub definitions: Vec<NarrativeDefinition>,
    pub scoring: ScoringConfig,
    pub confidence: ConfidenceThresholds,
    pub quality: QualityFilter,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            definitions: NARRATIVE_DEFINITIONS.to_vec(),
            scoring: ScoringConfig::default(),
            confidence: ConfidenceThresholds::default(),
            quality: QualityFilter::default(),
        }
    }
}

impl Taxonomy {
    pub fn with_momentum_mode(mut self, mode: MomentumMode) -> Self {
        self.scoring.momentum_mode = mode;
        self
    }

    pub fn definition(&self, name: &str) -> Option<&NarrativeDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = NARRATIVE_DEFINITIONS.iter().map(|d| d.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), NARRATIVE_DEFINITIONS.len());
    }

    #[test]
    fn keywords_are_lowercase() {
        for d in NARRATIVE_DEFINITIONS {
            for k in d.primary_keywords.iter().chain(d.secondary_keywords) {
                assert_eq!(*k, k.to_lowercase(), "{} has non-lowercase keyword", d.name);
            }
        }
    }

    #[test]
    fn layer2_max_possible_is_16() {
        let t = Taxonomy::default();
        let d = t.definition("Layer 2 Scaling").unwrap();
        assert!((d.max_possible(&t.scoring) - 16.0).abs() < 1e-9);
    }
}
