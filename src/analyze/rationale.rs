//! `why_now` rationale: a one-sentence explanation of a narrative's score.
//!
//! Shape: `<label> <momentum clause>[, <keyword clause>], <source clause>.`

use crate::narrative::{NarrativeScore, ScoredSignal};
use crate::signal::Source;

/// Signals at or above this recency count as "recent" for the rationale (≤12h).
const RECENT_RECENCY: f64 = 0.8;
const DEVELOPMENTS_MIN: usize = 3;
const TOP_KEYWORDS: usize = 2;

pub fn why_now(scored: &[ScoredSignal<'_>], score: &NarrativeScore) -> String {
    let recent: Vec<&ScoredSignal<'_>> = scored
        .iter()
        .filter(|s| s.recency_multiplier >= RECENT_RECENCY)
        .collect();

    let mut parts: Vec<String> = Vec::with_capacity(3);

    // 1) Momentum
    if recent.len() >= DEVELOPMENTS_MIN {
        parts.push(format!(
            "{} new developments emerged in the past 12 hours",
            recent.len()
        ));
    } else if score.momentum_score > 0.0 {
        parts.push("notable activity spike detected in recent hours".to_string());
    } else {
        parts.push("sustained discussion continuing".to_string());
    }

    // 2) Keywords among recent signals
    let top = top_keywords(&recent, TOP_KEYWORDS);
    match top.as_slice() {
        [] => {}
        [one] => parts.push(format!("around {one}")),
        [a, b, ..] => parts.push(format!("focusing on {a} and {b}")),
    }

    // 3) Source coverage
    let sources = distinct_sources(scored);
    let descs: Vec<&str> = sources.iter().map(Source::description).collect();
    match descs.len() {
        0 => {}
        1 => parts.push(format!("primarily from {} signals", descs[0])),
        2 => parts.push(format!("validated by both {} and {}", descs[0], descs[1])),
        _ => parts.push(format!("confirmed across {}", descs.join(", "))),
    }

    format!("{} {}.", score.confidence.label(), parts.join(", "))
}

/// Distinct sources in first-seen order.
pub(crate) fn distinct_sources(scored: &[ScoredSignal<'_>]) -> Vec<Source> {
    let mut out = Vec::new();
    for s in scored {
        if !out.contains(&s.signal.source) {
            out.push(s.signal.source);
        }
    }
    out
}

/// Most frequent matched keywords; ties keep first appearance.
fn top_keywords(recent: &[&ScoredSignal<'_>], n: usize) -> Vec<String> {
    let mut freq: Vec<(&str, usize)> = Vec::new();
    for s in recent {
        for kw in &s.matched.matched_keywords {
            match freq.iter_mut().find(|(k, _)| *k == kw.as_str()) {
                Some((_, c)) => *c += 1,
                None => freq.push((kw.as_str(), 1)),
            }
        }
    }
    // Stable sort keeps insertion order among equal counts.
    freq.sort_by(|a, b| b.1.cmp(&a.1));
    freq.into_iter().take(n).map(|(k, _)| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{Confidence, NarrativeMatch};
    use crate::signal::Signal;
    use chrono::{TimeZone, Utc};

    fn signal(source: Source, id: &str) -> Signal {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        Signal::new(source, id, "x", ts)
    }

    fn scored<'a>(s: &'a Signal, kws: &[&str], recency: f64) -> ScoredSignal<'a> {
        ScoredSignal {
            signal: s,
            matched: NarrativeMatch {
                narrative_name: "N".into(),
                strength: 0.5,
                matched_keywords: kws.iter().map(|k| k.to_string()).collect(),
                raw_score: 2.0,
            },
            source_weight: 1.0,
            recency_multiplier: recency,
            momentum_bonus: 0.0,
        }
    }

    fn score(confidence: Confidence, momentum: f64) -> NarrativeScore {
        NarrativeScore {
            base_score: 1.0,
            momentum_score: momentum,
            diversity_score: 0.0,
            penalty_score: 0.0,
            final_score: 1.0,
            confidence,
            explanation: String::new(),
        }
    }

    #[test]
    fn single_source_sustained() {
        let a = signal(Source::Farcaster, "1");
        let s = [scored(&a, &["layer 2", "rollup", "scaling"], 1.0)];
        let out = why_now(&s, &score(Confidence::Weak, 0.0));
        assert_eq!(
            out,
            "Weak signal: sustained discussion continuing, focusing on layer 2 and rollup, primarily from social discussion signals."
        );
    }

    #[test]
    fn spike_phrase_with_momentum_and_few_recent() {
        let a = signal(Source::Rss, "1");
        let b = signal(Source::Github, "2");
        let s = [scored(&a, &["defi"], 1.0), scored(&b, &["dex"], 0.6)];
        let out = why_now(&s, &score(Confidence::Emerging, 4.0));
        assert_eq!(
            out,
            "Emerging pattern: notable activity spike detected in recent hours, around defi, validated by both news coverage and developer activity."
        );
    }

    #[test]
    fn developments_and_coverage_across_three() {
        let a = signal(Source::Dune, "1");
        let b = signal(Source::Rss, "2");
        let c = signal(Source::Farcaster, "3");
        let s = [
            scored(&a, &["l2"], 1.0),
            scored(&b, &["rollup", "l2"], 0.8),
            scored(&c, &["rollup", "l2"], 1.0),
        ];
        let out = why_now(&s, &score(Confidence::Strong, 6.0));
        assert_eq!(
            out,
            "Strong signal: 3 new developments emerged in the past 12 hours, focusing on l2 and rollup, confirmed across on-chain data, news coverage, social discussion."
        );
    }

    #[test]
    fn no_recent_signals_omits_keyword_clause() {
        let a = signal(Source::Github, "1");
        let s = [scored(&a, &["defi"], 0.4)];
        let out = why_now(&s, &score(Confidence::Weak, 0.0));
        assert_eq!(
            out,
            "Weak signal: sustained discussion continuing, primarily from developer activity signals."
        );
    }
}
