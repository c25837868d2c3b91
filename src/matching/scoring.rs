use serde::{Deserialize, Serialize};

use crate::config::{MatchConfig, ScoreWeights, ScoringKind};

/// Per-criterion similarities, each in `[0,1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub count: f64,
    pub overlap: f64,
    pub adjacency: f64,
}

pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn combine(&self, components: &ScoreComponents) -> f64;
}

pub struct WeightedScore {
    weights: ScoreWeights,
}

impl WeightedScore {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

impl ScoringStrategy for WeightedScore {
    fn name(&self) -> &'static str {
        ScoringKind::Weighted.as_str()
    }

    fn combine(&self, components: &ScoreComponents) -> f64 {
        let w = self.weights;
        let total = w.count + w.overlap + w.adjacency;
        if total <= 0.0 {
            return 0.0;
        }
        let sum = w.count * components.count
            + w.overlap * components.overlap
            + w.adjacency * components.adjacency;
        (sum / total).clamp(0.0, 1.0)
    }
}

/// Scores a match by its weakest criterion.
pub struct StrictestScore;

impl ScoringStrategy for StrictestScore {
    fn name(&self) -> &'static str {
        ScoringKind::Strictest.as_str()
    }

    fn combine(&self, components: &ScoreComponents) -> f64 {
        components
            .count
            .min(components.overlap)
            .min(components.adjacency)
            .clamp(0.0, 1.0)
    }
}

pub fn strategy_for(config: &MatchConfig) -> Box<dyn ScoringStrategy> {
    match config.strategy {
        ScoringKind::Weighted => Box::new(WeightedScore::new(config.weights)),
        ScoringKind::Strictest => Box::new(StrictestScore),
    }
}
