//! Keyword matcher: picks the single best narrative for a piece of text.
//!
//! Scoring per definition: +primary weight per primary keyword found as a
//! substring of the lowercased text, +secondary weight per secondary keyword.
//! Strength is the raw score over the definition's maximum, capped at 1.0.
//! The highest raw score wins; on a tie the earlier definition stays.

use tracing::debug;

use crate::narrative::NarrativeMatch;
use crate::taxonomy::Taxonomy;

/// Short, stable, anonymized id for log lines. Raw text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Classify `text` against `taxonomy`. `None` when nothing reaches the
/// minimum keyword strength.
pub fn classify_with(text: &str, taxonomy: &Taxonomy) -> Option<NarrativeMatch> {
    let cfg = &taxonomy.scoring;
    let lower = text.to_lowercase();

    let mut best: Option<NarrativeMatch> = None;

    for def in &taxonomy.definitions {
        let mut score = 0.0;
        let mut matched = Vec::new();

        for kw in def.primary_keywords {
            if lower.contains(kw) {
                score += cfg.primary_keyword_weight;
                matched.push((*kw).to_string());
            }
        }
        for kw in def.secondary_keywords {
            if lower.contains(kw) {
                score += cfg.secondary_keyword_weight;
                matched.push((*kw).to_string());
            }
        }

        if score <= 0.0 {
            continue;
        }

        let max_possible = def.max_possible(cfg);
        let strength = if max_possible > 0.0 {
            (score / max_possible).min(1.0)
        } else {
            0.0
        };

        // Strictly greater: first-seen wins ties.
        let better = match &best {
            None => true,
            Some(b) => score > b.raw_score,
        };
        if better {
            best = Some(NarrativeMatch {
                narrative_name: def.name.to_string(),
                strength,
                matched_keywords: matched,
                raw_score: score,
            });
        }
    }

    let out = best.filter(|m| m.strength >= cfg.min_keyword_strength);

    debug!(
        target: "engine",
        id = %anon_hash(text),
        narrative = out.as_ref().map(|m| m.narrative_name.as_str()).unwrap_or("-"),
        strength = out.as_ref().map(|m| m.strength).unwrap_or(0.0),
        "classified"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::NarrativeDefinition;

    fn tax() -> Taxonomy {
        Taxonomy::default()
    }

    #[test]
    fn layer2_example_strength() {
        let m = classify_with("layer 2 rollup scaling gas fees", &tax()).expect("match");
        assert_eq!(m.narrative_name, "Layer 2 Scaling");
        assert!((m.raw_score - 6.0).abs() < 1e-9);
        assert!((m.strength - 0.375).abs() < 1e-9);
        for kw in ["layer 2", "rollup", "scaling", "gas fees"] {
            assert!(m.matched_keywords.iter().any(|k| k == kw), "missing {kw}");
        }
    }

    #[test]
    fn case_insensitive() {
        let a = classify_with("EIGENLAYER Restaking AVS", &tax()).unwrap();
        assert_eq!(a.narrative_name, "Restaking");
    }

    #[test]
    fn no_keywords_yields_none() {
        assert!(classify_with("the weather is lovely today", &tax()).is_none());
        assert!(classify_with("", &tax()).is_none());
    }

    #[test]
    fn below_min_strength_yields_none() {
        // Single secondary hit: 1 / 12 ≈ 0.083 < 0.1.
        let m = classify_with("we love automation", &tax());
        assert!(m.is_none());
    }

    #[test]
    fn tie_keeps_first_definition() {
        let mut t = tax();
        t.definitions = vec![
            NarrativeDefinition {
                name: "First",
                primary_keywords: &["alpha"],
                secondary_keywords: &[],
            },
            NarrativeDefinition {
                name: "Second",
                primary_keywords: &["beta"],
                secondary_keywords: &[],
            },
        ];
        let m = classify_with("alpha and beta", &t).unwrap();
        assert_eq!(m.narrative_name, "First");

        t.definitions.reverse();
        let m = classify_with("alpha and beta", &t).unwrap();
        assert_eq!(m.narrative_name, "Second");
    }

    #[test]
    fn highest_raw_score_wins() {
        // DeFi: defi + dex + liquidity = 6 raw (6/14 ≈ 0.43).
        // Restaking: restaking = 2 raw (2/11 ≈ 0.18).
        let m = classify_with("defi dex liquidity restaking", &tax()).unwrap();
        assert_eq!(m.narrative_name, "DeFi Revival");
    }

    #[test]
    fn strength_always_in_unit_range() {
        let texts = [
            "layer 2 l2 rollup arbitrum optimism base scaling throughput gas fees transaction cost",
            "farcaster warpcast frames farcaster protocol social protocol",
            "agents agents agents",
            "database", // "base" substring
        ];
        for t in texts {
            if let Some(m) = classify_with(t, &tax()) {
                assert!((0.0..=1.0).contains(&m.strength), "{t}: {}", m.strength);
            }
        }
    }

    #[test]
    fn anon_hash_is_stable_and_short() {
        assert_eq!(anon_hash("x"), anon_hash("x"));
        assert_eq!(anon_hash("x").len(), 12);
    }
}
