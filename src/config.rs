use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const ENGINE_CONFIG_FILE: &str = "engine_config.json";
pub const DEFAULT_MAX_CELLS: u64 = 4_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_cells: u64,
    pub segment: SegmentConfig,
    pub matching: MatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
            segment: SegmentConfig::default(),
            matching: MatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Fully empty rows/columns allowed between two rectangles that still merge.
    pub max_gap: u32,
    /// Required span overlap, as a fraction of the narrower span.
    pub min_overlap: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_gap: 1,
            min_overlap: 0.5,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    Weighted,
    Strictest,
}

impl ScoringKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Strictest => "strictest",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub count: f64,
    pub overlap: f64,
    pub adjacency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            count: 0.2,
            overlap: 0.5,
            adjacency: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub threshold: f64,
    pub strategy: ScoringKind,
    pub weights: ScoreWeights,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            strategy: ScoringKind::Weighted,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigOverrides {
    pub max_cells: Option<u64>,
    pub min_overlap: Option<f64>,
    pub threshold: Option<f64>,
    pub strategy: Option<ScoringKind>,
}

impl EngineConfig {
    pub fn load(cache_root: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let path = cache_root.join(ENGINE_CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_slice::<EngineConfig>(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            EngineConfig::default()
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(max_cells) = overrides.max_cells {
            self.max_cells = max_cells;
        }
        if let Some(min_overlap) = overrides.min_overlap {
            self.segment.min_overlap = min_overlap;
        }
        if let Some(threshold) = overrides.threshold {
            self.matching.threshold = threshold;
        }
        if let Some(strategy) = overrides.strategy {
            self.matching.strategy = strategy;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.segment.min_overlap) {
            bail!(
                "segment.min_overlap must be within [0,1], got {}",
                self.segment.min_overlap
            );
        }
        if !(0.0..=1.0).contains(&self.matching.threshold) {
            bail!(
                "matching.threshold must be within [0,1], got {}",
                self.matching.threshold
            );
        }

        let weights = self.matching.weights;
        let all = [weights.count, weights.overlap, weights.adjacency];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("matching.weights must be finite and non-negative: {weights:?}");
        }
        if all.iter().sum::<f64>() <= 0.0 {
            bail!("matching.weights must not all be zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.segment.max_gap, 1);
        assert!((config.matching.threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(ENGINE_CONFIG_FILE),
            r#"{"matching": {"threshold": 0.75}}"#,
        )
        .unwrap();

        let config = EngineConfig::load(dir.path(), ConfigOverrides::default()).unwrap();
        assert!((config.matching.threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.max_cells, DEFAULT_MAX_CELLS);
        assert_eq!(config.matching.strategy, ScoringKind::Weighted);
    }

    #[test]
    fn overrides_win_and_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = ConfigOverrides {
            threshold: Some(1.5),
            ..ConfigOverrides::default()
        };
        assert!(EngineConfig::load(dir.path(), overrides).is_err());

        let overrides = ConfigOverrides {
            max_cells: Some(10),
            strategy: Some(ScoringKind::Strictest),
            ..ConfigOverrides::default()
        };
        let config = EngineConfig::load(dir.path(), overrides).unwrap();
        assert_eq!(config.max_cells, 10);
        assert_eq!(config.matching.strategy, ScoringKind::Strictest);
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut config = EngineConfig::default();
        config.matching.weights = ScoreWeights {
            count: 0.0,
            overlap: 0.0,
            adjacency: 0.0,
        };
        assert!(config.validate().is_err());
    }
}
