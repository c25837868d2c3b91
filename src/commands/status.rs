use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::Workspace;
use crate::config::ENGINE_CONFIG_FILE;

pub fn run(args: StatusArgs) -> Result<()> {
    let config_path = args.engine.cache_root.join(ENGINE_CONFIG_FILE);
    info!(cache_root = %args.engine.cache_root.display(), "status requested");

    if !config_path.exists() {
        warn!(path = %config_path.display(), "engine config missing, using defaults");
    }

    let workspace = Workspace::open(&args.engine)?;
    let config = &workspace.config;
    info!(
        max_cells = config.max_cells,
        max_gap = config.segment.max_gap,
        min_overlap = config.segment.min_overlap,
        threshold = config.matching.threshold,
        strategy = config.matching.strategy.as_str(),
        "engine config"
    );

    let templates = workspace.store.count()?;
    let newest = workspace.store.list()?.into_iter().max_by_key(|t| t.sequence);
    info!(
        path = %workspace.store.path().display(),
        templates,
        newest_template = newest
            .as_ref()
            .map(|t| t.template_id.as_str())
            .unwrap_or(""),
        newest_created_at = newest
            .as_ref()
            .map(|t| t.created_at.as_str())
            .unwrap_or(""),
        "template store status"
    );

    info!(cached_layouts = workspace.layouts.count()?, "layout cache status");

    Ok(())
}
