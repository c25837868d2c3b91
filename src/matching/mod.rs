use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MatchConfig;
use crate::fingerprint::Fingerprint;
use crate::model::BlockKey;
use crate::store::Template;

mod pairing;
mod scoring;

use pairing::{adjacency_similarity, count_similarity, overlap_similarity, pair_blocks};
pub use scoring::{ScoreComponents, ScoringStrategy, StrictestScore, WeightedScore, strategy_for};

/// Correspondence between a template block and a candidate block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPair {
    pub template_key: BlockKey,
    pub candidate_key: BlockKey,
    pub overlap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub template_id: String,
    pub template_name: Option<String>,
    pub score: f64,
    pub confident: bool,
    pub strategy: String,
    pub components: ScoreComponents,
    pub pairs: Vec<BlockPair>,
}

/// Scores `candidate` against one template.
pub fn match_one(
    candidate: &Fingerprint,
    template: &Template,
    config: &MatchConfig,
    strategy: &dyn ScoringStrategy,
) -> MatchResult {
    let source = &template.fingerprint;
    let pairs = pair_blocks(source, candidate);

    let components = ScoreComponents {
        count: count_similarity(source, candidate),
        overlap: overlap_similarity(source, candidate, &pairs),
        adjacency: adjacency_similarity(source, candidate, &pairs),
    };
    let score = strategy.combine(&components);

    debug!(
        template_id = %template.template_id,
        score,
        count = components.count,
        overlap = components.overlap,
        adjacency = components.adjacency,
        "scored template"
    );

    MatchResult {
        template_id: template.template_id.clone(),
        template_name: template.name.clone(),
        score,
        confident: score >= config.threshold,
        strategy: strategy.name().to_string(),
        components,
        pairs: pairs
            .iter()
            .map(|pair| BlockPair {
                template_key: source.blocks[pair.template].key,
                candidate_key: candidate.blocks[pair.candidate].key,
                overlap: pair.overlap,
            })
            .collect(),
    }
}

/// Scores `candidate` against every template, best first. Equal scores go to
/// the most recently created template.
pub fn match_templates(
    candidate: &Fingerprint,
    templates: &[Template],
    config: &MatchConfig,
) -> Vec<MatchResult> {
    let strategy = strategy_for(config);

    let mut scored = templates
        .iter()
        .map(|template| {
            (
                template.sequence,
                match_one(candidate, template, config, strategy.as_ref()),
            )
        })
        .collect::<Vec<_>>();

    scored.sort_by(|(seq_a, a), (seq_b, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(seq_b.cmp(seq_a))
            .then_with(|| a.template_id.cmp(&b.template_id))
    });

    scored.into_iter().map(|(_, result)| result).collect()
}
