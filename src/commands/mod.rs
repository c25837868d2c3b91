pub mod annotate;
pub mod apply;
pub mod batch;
pub mod detect;
pub mod export;
pub mod session;
pub mod status;
pub mod template;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::cli::EngineArgs;
use crate::config::EngineConfig;
use crate::model::{BlockRecord, Layout, layout_records};
use crate::service::Engine;
use crate::store::TemplateStore;

use session::{DetectSettings, GridFile, LayoutCache};

/// Everything a command needs under one cache root.
pub struct Workspace {
    pub config: EngineConfig,
    pub store: TemplateStore,
    pub layouts: LayoutCache,
}

impl Workspace {
    pub fn open(args: &EngineArgs) -> Result<Self> {
        let config = EngineConfig::load(&args.cache_root, args.overrides())?;
        let store = TemplateStore::open_in(&args.cache_root).with_context(|| {
            format!(
                "failed to open template store under {}",
                args.cache_root.display()
            )
        })?;
        debug!(
            cache_root = %args.cache_root.display(),
            max_cells = config.max_cells,
            threshold = config.matching.threshold,
            strategy = config.matching.strategy.as_str(),
            "workspace opened"
        );

        let layouts = LayoutCache::new(&args.cache_root, DetectSettings::from(&config));
        Ok(Self {
            config,
            store,
            layouts,
        })
    }

    pub fn engine(&self) -> Engine<'_> {
        Engine::new(&self.config, &self.store)
    }
}

#[derive(Debug, Serialize)]
pub struct LayoutOutput {
    pub grid: String,
    pub grid_sha256: String,
    pub blocks: Vec<BlockRecord>,
}

impl LayoutOutput {
    pub fn new(file: &GridFile, layout: &Layout) -> Self {
        Self {
            grid: file.path.display().to_string(),
            grid_sha256: file.sha256.clone(),
            blocks: layout_records(layout, &file.grid),
        }
    }
}
