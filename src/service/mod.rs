use tracing::{debug, info};

use crate::annotate;
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::export;
use crate::fingerprint::fingerprint;
use crate::matching::{MatchResult, match_one, strategy_for};
use crate::model::{BlockKey, Grid, Layout};
use crate::segment::segment;
use crate::store::{Template, TemplateStore};

mod batch;

pub use batch::{BatchEntry, BatchInput, batch_match};

/// Caller-facing operations over one template store.
pub struct Engine<'a> {
    config: &'a EngineConfig,
    store: &'a TemplateStore,
}

/// Outcome of a successful template application.
#[derive(Debug, Clone)]
pub struct Applied {
    pub layout: Layout,
    pub result: MatchResult,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a EngineConfig, store: &'a TemplateStore) -> Self {
        Self { config, store }
    }

    pub fn detect(&self, grid: &Grid) -> CoreResult<Layout> {
        segment(grid, self.config)
    }

    pub fn save_template(&self, layout: &Layout, name: Option<&str>) -> CoreResult<Template> {
        let template = self.store.save(layout, name)?;
        info!(
            template_id = %template.template_id,
            name = template.name.as_deref().unwrap_or(""),
            blocks = template.layout.len(),
            "template saved"
        );
        Ok(template)
    }

    pub fn load_template(&self, id_or_name: &str) -> CoreResult<Template> {
        self.store.load(id_or_name)
    }

    pub fn annotate(&self, layout: &Layout, key: BlockKey, label: &str) -> CoreResult<Layout> {
        annotate::annotate(layout, key, label)
    }

    /// Matches `grid` against one template and, when the match clears the
    /// threshold, carries its annotations over.
    pub fn apply_template(&self, grid: &Grid, id_or_name: &str) -> CoreResult<Applied> {
        let template = self.store.load(id_or_name)?;
        let layout = self.detect(grid)?;

        let result = self.validate_match(&layout, &template)?;
        let layout = annotate::transplant(&layout, &template, &result.pairs);

        debug!(
            template_id = %template.template_id,
            score = result.score,
            pairs = result.pairs.len(),
            "transplanted annotations"
        );

        Ok(Applied { layout, result })
    }

    fn validate_match(&self, layout: &Layout, template: &Template) -> CoreResult<MatchResult> {
        let candidate = fingerprint(layout, layout.extent);
        let matching = &self.config.matching;
        let strategy = strategy_for(matching);
        let result = match_one(&candidate, template, matching, strategy.as_ref());

        if !result.confident {
            return Err(CoreError::NoConfidentMatch {
                template_id: template.template_id.clone(),
                score: result.score,
                threshold: matching.threshold,
            });
        }
        Ok(result)
    }

    pub fn batch_match(&self, inputs: Vec<BatchInput>, templates: &[Template]) -> Vec<BatchEntry> {
        batch_match(inputs, templates, self.config)
    }

    pub fn export_tabular(&self, layout: &Layout, grid: &Grid) -> CoreResult<Vec<u8>> {
        export::export_tabular(layout, grid)
    }
}
