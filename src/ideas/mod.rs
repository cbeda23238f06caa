//! # App ideas
//! Rule-based app suggestions for the top stored narratives.
//!
//! Each narrative contributes one idea per static pattern. Ideas are ranked by
//! the narrative score discounted by its confidence tier.

pub mod patterns;
pub mod templates;

use serde::Serialize;

use crate::narrative::{round2, Confidence};
use crate::store::{NarrativeStore, StoreError, StoredNarrative};

pub use patterns::patterns_for;
pub use templates::{template_spec, TemplateSpec};

/// Narratives read for the default `/ideas` listing and for id lookups.
pub const DEFAULT_NARRATIVE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppIdea {
    pub idea_title: &'static str,
    pub one_liner: &'static str,
    pub target_user: &'static str,
    pub core_user_flow: &'static [&'static str],
    pub minidev_template_hint: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAppIdea {
    #[serde(flatten)]
    pub idea: AppIdea,
    pub narrative_name: String,
    pub narrative_confidence: Confidence,
    pub narrative_score: f64,
    pub rank_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppIdeaWithTemplate {
    #[serde(flatten)]
    pub ranked: RankedAppIdea,
    pub template_spec: TemplateSpec,
}

fn confidence_multiplier(c: Confidence) -> f64 {
    match c {
        Confidence::Strong => 1.0,
        Confidence::Emerging => 0.8,
        Confidence::Weak => 0.6,
    }
}

/// One ranked idea per pattern of each narrative, best first. Ties keep input order.
pub fn generate_app_ideas(narratives: &[StoredNarrative]) -> Vec<RankedAppIdea> {
    let mut ideas: Vec<RankedAppIdea> = narratives
        .iter()
        .flat_map(|n| {
            let rank_score = round2(n.score * confidence_multiplier(n.confidence));
            patterns_for(&n.narrative_name)
                .iter()
                .map(move |p| RankedAppIdea {
                    idea: p.idea,
                    narrative_name: n.narrative_name.clone(),
                    narrative_confidence: n.confidence,
                    narrative_score: n.score,
                    rank_score,
                })
        })
        .collect();
    ideas.sort_by(|a, b| b.rank_score.total_cmp(&a.rank_score));
    ideas
}

impl From<RankedAppIdea> for AppIdeaWithTemplate {
    fn from(ranked: RankedAppIdea) -> Self {
        let template_spec = template_spec(&ranked.idea);
        Self {
            ranked,
            template_spec,
        }
    }
}

/// Ideas with scaffolds for the top `narrative_limit` stored narratives.
pub async fn ideas_for_top<S: NarrativeStore + ?Sized>(
    store: &S,
    narrative_limit: usize,
) -> Result<Vec<AppIdeaWithTemplate>, StoreError> {
    let top = store.list(narrative_limit).await?;
    Ok(generate_app_ideas(&top)
        .into_iter()
        .map(AppIdeaWithTemplate::from)
        .collect())
}

/// 1-based position in the default listing.
pub async fn idea_by_id<S: NarrativeStore + ?Sized>(
    store: &S,
    id: usize,
) -> Result<Option<AppIdeaWithTemplate>, StoreError> {
    if id == 0 {
        return Ok(None);
    }
    let mut all = ideas_for_top(store, DEFAULT_NARRATIVE_LIMIT).await?;
    Ok((id <= all.len()).then(|| all.swap_remove(id - 1)))
}
