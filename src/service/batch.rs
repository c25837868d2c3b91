use rayon::prelude::*;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::CoreResult;
use crate::fingerprint::fingerprint;
use crate::matching::{MatchResult, match_templates};
use crate::model::{Grid, Layout};
use crate::segment::segment;
use crate::store::Template;

/// One file handed to a batch; ingestion failures travel in `grid`.
pub struct BatchInput {
    pub filename: String,
    pub grid: CoreResult<Grid>,
}

#[derive(Debug, Clone)]
pub struct BatchMatch {
    /// `None` when there were no candidate templates.
    pub best: Option<MatchResult>,
    pub layout: Layout,
}

#[derive(Debug)]
pub struct BatchEntry {
    pub filename: String,
    pub outcome: CoreResult<BatchMatch>,
}

/// Matches every input independently. Output order mirrors input order and a
/// failing file only fills its own slot.
pub fn batch_match(
    inputs: Vec<BatchInput>,
    templates: &[Template],
    config: &EngineConfig,
) -> Vec<BatchEntry> {
    inputs
        .into_par_iter()
        .map(|input| {
            let outcome = input
                .grid
                .and_then(|grid| match_grid(&grid, templates, config));
            BatchEntry {
                filename: input.filename,
                outcome,
            }
        })
        .collect()
}

fn match_grid(grid: &Grid, templates: &[Template], config: &EngineConfig) -> CoreResult<BatchMatch> {
    let layout = segment(grid, config)?;
    let candidate = fingerprint(&layout, grid.extent());
    let best = match_templates(&candidate, templates, &config.matching)
        .into_iter()
        .next();

    debug!(
        blocks = layout.len(),
        best = best.as_ref().map(|m| m.template_id.as_str()).unwrap_or(""),
        score = best.as_ref().map(|m| m.score).unwrap_or(0.0),
        "batch file matched"
    );

    Ok(BatchMatch { best, layout })
}
