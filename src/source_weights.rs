//! # Source Weights
//!
//! Fixed authority multipliers per signal source.
//!
//! - Keyed by the closed [`Source`] enum, never by raw strings.
//! - A source missing from the table falls back to `default_weight` (1.0).
//! - `default_seed()` carries the built-in table: dune 3.0, rss 2.0,
//!   github 1.5, farcaster 1.0.

use serde::Serialize;
use std::collections::HashMap;

use crate::signal::Source;

#[derive(Debug, Clone, Serialize)]
pub struct SourceWeights {
    /// Weight for sources absent from `weights`.
    pub default_weight: f64,
    pub weights: HashMap<Source, f64>,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceWeights {
    pub fn default_seed() -> Self {
        let weights = [
            (Source::Dune, 3.0),
            (Source::Rss, 2.0),
            (Source::Github, 1.5),
            (Source::Farcaster, 1.0),
        ]
        .into_iter()
        .collect();

        Self {
            default_weight: 1.0,
            weights,
        }
    }

    /// Weight for a given source, or `default_weight` if the table has no entry.
    pub fn weight_for(&self, source: Source) -> f64 {
        self.weights
            .get(&source)
            .copied()
            .unwrap_or(self.default_weight)
    }
}
