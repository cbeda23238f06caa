//! # Narrative Engine
//! Pure, testable aggregation: `signals` → ranked, filtered `ProcessedNarrative`s.
//! No I/O; the clock is an explicit argument of `process_at`.
//!
//! Pipeline per run:
//! 1) match each signal (title + text) to at most one narrative;
//! 2) attach source weight, recency and momentum to each matched signal;
//! 3) reduce each narrative bucket to a `NarrativeScore`;
//! 4) build rationale and evidence, apply the quality filter, sort.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::analyze::{classify_with, momentum_bonus, recency_multiplier, why_now};
use crate::analyze::rationale::distinct_sources;
use crate::narrative::{
    round2, Confidence, Evidence, NarrativeMatch, NarrativeScore, ProcessedNarrative, ScoredSignal,
};
use crate::signal::Signal;
use crate::source_weights::SourceWeights;
use crate::taxonomy::{MomentumMode, Taxonomy};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub taxonomy: Taxonomy,
    pub weights: SourceWeights,
}

impl Engine {
    pub fn new(taxonomy: Taxonomy, weights: SourceWeights) -> Self {
        Self { taxonomy, weights }
    }

    pub fn classify(&self, text: &str) -> Option<NarrativeMatch> {
        classify_with(text, &self.taxonomy)
    }

    /// Run the full pipeline against a frozen `now`. Deterministic for equal input.
    pub fn process_at(&self, signals: &[Signal], now: DateTime<Utc>) -> Vec<ProcessedNarrative> {
        let t0 = std::time::Instant::now();
        let buckets = self.bucket(signals, now);
        let matched: usize = buckets.values().map(Vec::len).sum();

        let mut out: Vec<(ProcessedNarrative, usize)> = buckets
            .into_iter()
            .map(|(name, scored)| {
                let score = self.score_bucket(&scored);
                let sources = distinct_sources(&scored).len();
                debug!(
                    target: "engine",
                    narrative = %name,
                    signals = scored.len(),
                    sources,
                    score = score.final_score,
                    explanation = %score.explanation,
                    "bucket reduced"
                );
                let narrative = ProcessedNarrative {
                    why_now: why_now(&scored, &score),
                    evidence: self.evidence(&scored),
                    narrative_name: name,
                    score: score.final_score,
                    confidence: score.confidence,
                };
                (narrative, sources)
            })
            .filter(|(n, sources)| self.passes_quality(n, *sources))
            .collect();

        out.sort_by(|(a, _), (b, _)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.narrative_name.cmp(&b.narrative_name))
        });
        let out: Vec<ProcessedNarrative> = out.into_iter().map(|(n, _)| n).collect();

        histogram!("engine_process_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("engine_runs_total").increment(1);
        counter!("engine_signals_matched_total").increment(matched as u64);
        gauge!("engine_narratives_last_run").set(out.len() as f64);

        info!(
            target: "engine",
            signals = signals.len(),
            matched,
            narratives = out.len(),
            "narrative run complete"
        );
        out
    }

    /// Match, weight and group signals by narrative name.
    fn bucket<'a>(
        &self,
        signals: &'a [Signal],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, Vec<ScoredSignal<'a>>> {
        let cfg = &self.taxonomy.scoring;
        let mut buckets: BTreeMap<String, Vec<ScoredSignal<'a>>> = BTreeMap::new();

        for signal in signals {
            let text = signal.combined_text();
            if text.is_empty() {
                continue;
            }
            let Some(matched) = classify_with(&text, &self.taxonomy) else {
                continue;
            };

            let bucket = buckets.entry(matched.narrative_name.clone()).or_default();

            let momentum = match cfg.momentum_mode {
                MomentumMode::Incremental => {
                    let members = bucket.iter().map(|s| s.signal).chain(std::iter::once(signal));
                    momentum_bonus(members, now, cfg) / (bucket.len() + 1) as f64
                }
                MomentumMode::PerBucket => 0.0,
            };

            bucket.push(ScoredSignal {
                signal,
                source_weight: self.weights.weight_for(signal.source),
                recency_multiplier: recency_multiplier(signal.timestamp, now),
                momentum_bonus: momentum,
                matched,
            });
        }

        if cfg.momentum_mode == MomentumMode::PerBucket {
            for bucket in buckets.values_mut() {
                let total = momentum_bonus(bucket.iter().map(|s| s.signal), now, cfg);
                let share = total / bucket.len() as f64;
                for s in bucket.iter_mut() {
                    s.momentum_bonus = share;
                }
            }
        }

        buckets
    }

    /// Reduce one bucket to its composite score and confidence tier.
    pub fn score_bucket(&self, scored: &[ScoredSignal<'_>]) -> NarrativeScore {
        if scored.is_empty() {
            return NarrativeScore {
                base_score: 0.0,
                momentum_score: 0.0,
                diversity_score: 0.0,
                penalty_score: 0.0,
                final_score: 0.0,
                confidence: Confidence::Weak,
                explanation: "No signals found".to_string(),
            };
        }

        let cfg = &self.taxonomy.scoring;
        let th = &self.taxonomy.confidence;

        let base: f64 = scored
            .iter()
            .map(|s| s.matched.strength * s.source_weight * s.recency_multiplier)
            .sum();
        let momentum: f64 = scored.iter().map(|s| s.momentum_bonus).sum();

        let sources = distinct_sources(scored).len();
        let diversity_multiplier =
            (sources as f64 * cfg.diversity_step).min(cfg.max_diversity_multiplier);
        let diversity = base * diversity_multiplier;

        let avg_strength =
            scored.iter().map(|s| s.matched.strength).sum::<f64>() / scored.len() as f64;

        let mut penalty = 0.0;
        if sources == 1 {
            penalty += base * cfg.single_source_penalty;
        }
        if avg_strength < cfg.weak_keyword_threshold {
            penalty += base * cfg.weak_keyword_penalty;
        }

        let final_score = (base + momentum + diversity - penalty).max(0.0);

        let confidence = if final_score > th.strong_score
            && sources >= th.strong_sources
            && avg_strength > th.strong_strength
        {
            Confidence::Strong
        } else if final_score > th.emerging_score && sources >= th.emerging_sources {
            Confidence::Emerging
        } else {
            Confidence::Weak
        };

        let mut explanation = vec![
            format!("Base: {:.1} (keyword×source×recency)", base),
            format!("Momentum: {:.1} (recent spikes)", momentum),
            format!("Diversity: {:.1} ({} sources)", diversity, sources),
        ];
        if penalty > 0.0 {
            explanation.push(format!("Penalty: -{:.1}", penalty));
        }

        NarrativeScore {
            base_score: round2(base),
            momentum_score: round2(momentum),
            diversity_score: round2(diversity),
            penalty_score: round2(penalty),
            final_score: round2(final_score),
            confidence,
            explanation: explanation.join(", "),
        }
    }

    /// Top signals by `source_weight × strength`; ties keep input order.
    fn evidence(&self, scored: &[ScoredSignal<'_>]) -> Vec<Evidence> {
        let mut ranked: Vec<&ScoredSignal<'_>> = scored.iter().collect();
        ranked.sort_by(|a, b| {
            let wa = a.source_weight * a.matched.strength;
            let wb = b.source_weight * b.matched.strength;
            wb.total_cmp(&wa)
        });
        ranked
            .into_iter()
            .take(self.taxonomy.scoring.evidence_cap)
            .map(|s| Evidence {
                source: s.signal.source,
                url: s
                    .signal
                    .url
                    .clone()
                    .unwrap_or_else(|| format!("#{}", s.signal.external_id)),
            })
            .collect()
    }

    fn passes_quality(&self, n: &ProcessedNarrative, sources: usize) -> bool {
        let q = &self.taxonomy.quality;
        if n.score < q.single_source_min_score && sources == 1 {
            return false;
        }
        if n.score < q.weak_min_score && n.confidence == Confidence::Weak {
            return false;
        }
        true
    }
}

/// Run the default engine against the wall clock.
pub fn process(signals: &[Signal]) -> Vec<ProcessedNarrative> {
    process_at(signals, Utc::now())
}

/// Run the default engine against a frozen clock.
pub fn process_at(signals: &[Signal], now: DateTime<Utc>) -> Vec<ProcessedNarrative> {
    Engine::default().process_at(signals, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Source;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn sig(source: Source, id: &str, text: &str, hours_ago: i64) -> Signal {
        Signal::new(source, id, text, now() - Duration::hours(hours_ago))
    }

    fn scored_bucket<'a>(engine: &Engine, signals: &'a [Signal]) -> Vec<ScoredSignal<'a>> {
        engine
            .bucket(signals, now())
            .into_values()
            .next()
            .expect("one bucket")
    }

    #[test]
    fn single_farcaster_signal_scores_weak() {
        let engine = Engine::default();
        let signals = [sig(Source::Farcaster, "c1", "layer 2 rollup scaling gas fees", 1)];
        let bucket = scored_bucket(&engine, &signals);
        let score = engine.score_bucket(&bucket);

        assert!((score.base_score - 0.38).abs() < 1e-9);
        assert_eq!(score.momentum_score, 0.0);
        assert!((score.diversity_score - 0.19).abs() < 1e-9);
        assert!((score.penalty_score - 0.19).abs() < 1e-9);
        assert!((score.final_score - 0.38).abs() < 1e-9);
        assert_eq!(score.confidence, Confidence::Weak);
        assert!(score.explanation.starts_with("Base: 0.4"));

        // And the quality filter drops it from the output.
        assert!(engine.process_at(&signals, now()).is_empty());
    }

    #[test]
    fn empty_bucket_scores_zero() {
        let s = Engine::default().score_bucket(&[]);
        assert_eq!(s.final_score, 0.0);
        assert_eq!(s.confidence, Confidence::Weak);
        assert_eq!(s.explanation, "No signals found");
    }

    #[test]
    fn per_bucket_momentum_is_order_independent() {
        let engine = Engine::default();
        let mut signals = vec![
            sig(Source::Rss, "a", "defi dex liquidity", 30),
            sig(Source::Github, "b", "defi dex liquidity", 1),
            sig(Source::Dune, "c", "defi dex liquidity", 2),
            sig(Source::Farcaster, "d", "defi dex liquidity", 3),
        ];
        let forward = engine.score_bucket(&scored_bucket(&engine, &signals));
        signals.reverse();
        let backward = engine.score_bucket(&scored_bucket(&engine, &signals));

        // 3 recent vs 1 older → 3 × 2.0
        assert!((forward.momentum_score - 6.0).abs() < 1e-9);
        assert_eq!(forward, backward);
    }

    #[test]
    fn incremental_momentum_depends_on_order() {
        let engine = Engine::new(
            Taxonomy::default().with_momentum_mode(MomentumMode::Incremental),
            SourceWeights::default(),
        );
        let mut signals = vec![
            sig(Source::Rss, "a", "defi dex liquidity", 30),
            sig(Source::Github, "b", "defi dex liquidity", 1),
            sig(Source::Dune, "c", "defi dex liquidity", 2),
        ];
        // old, new, new: [0, 0, 4/3]
        let forward = engine.score_bucket(&scored_bucket(&engine, &signals));
        assert!((forward.momentum_score - 1.33).abs() < 1e-9);

        // new, new, old: [0, 4/2, 4/3]
        signals.reverse();
        let backward = engine.score_bucket(&scored_bucket(&engine, &signals));
        assert!((backward.momentum_score - 3.33).abs() < 1e-9);
    }

    #[test]
    fn weak_keyword_penalty_applies() {
        let engine = Engine::default();
        // "base" alone: 2 / 16 = 0.125 < 0.3
        let signals = [
            sig(Source::Rss, "a", "coinbase", 1),
            sig(Source::Github, "b", "a new base", 1),
        ];
        let s = engine.score_bucket(&scored_bucket(&engine, &signals));
        // base = 0.125×2 + 0.125×1.5 = 0.4375; diversity ×1.0; penalty ×0.3;
        // two fresh signals → momentum 2 × 2.0
        assert!((s.base_score - 0.44).abs() < 1e-9);
        assert!((s.momentum_score - 4.0).abs() < 1e-9);
        assert!((s.penalty_score - 0.13).abs() < 1e-9);
        assert!((s.final_score - 4.74).abs() < 1e-9);
    }

    #[test]
    fn strong_requires_three_sources_and_strength() {
        let engine = Engine::default();
        let text = "eigenlayer restaking avs actively validated validator";
        let signals = [
            sig(Source::Dune, "a", text, 1),
            sig(Source::Rss, "b", text, 1),
            sig(Source::Github, "c", text, 2),
            sig(Source::Farcaster, "d", text, 3),
        ];
        let out = engine.process_at(&signals, now());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].narrative_name, "Restaking");
        assert_eq!(out[0].confidence, Confidence::Strong);
        assert!(out[0].why_now.starts_with("Strong signal: 4 new developments"));
        assert_eq!(out[0].evidence[0].source, Source::Dune);
    }

    #[test]
    fn evidence_capped_and_falls_back_to_external_id() {
        let engine = Engine::default();
        let signals: Vec<Signal> = (0..8)
            .map(|i| {
                let s = sig(
                    if i % 2 == 0 { Source::Rss } else { Source::Github },
                    &format!("id{i}"),
                    "arbitrum optimism rollup l2",
                    1,
                );
                if i == 0 {
                    s.with_url("https://example.test/0")
                } else {
                    s
                }
            })
            .collect();
        let out = engine.process_at(&signals, now());
        assert_eq!(out.len(), 1);
        let ev = &out[0].evidence;
        assert_eq!(ev.len(), 5);
        assert_eq!(ev[0].url, "https://example.test/0");
        assert_eq!(ev[1].url, "#id2");
        assert!(ev.iter().take(4).all(|e| e.source == Source::Rss));
    }

    #[test]
    fn blank_and_unmatched_signals_are_skipped() {
        let engine = Engine::default();
        let signals = [
            sig(Source::Rss, "a", "   ", 1),
            sig(Source::Rss, "b", "cats and dogs", 1),
        ];
        assert!(engine.bucket(&signals, now()).is_empty());
        assert!(engine.process_at(&signals, now()).is_empty());
    }

    #[test]
    fn title_participates_in_matching() {
        let engine = Engine::default();
        let s = sig(Source::Rss, "a", "weekly notes", 1).with_title("EigenLayer restaking update");
        let buckets = engine.bucket(std::slice::from_ref(&s), now());
        assert!(buckets.contains_key("Restaking"));
    }
}
