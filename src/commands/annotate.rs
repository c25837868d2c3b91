use anyhow::{Context, Result};
use tracing::info;

use crate::cli::AnnotateArgs;
use crate::commands::session::{GridFile, current_layout};
use crate::commands::{LayoutOutput, Workspace};
use crate::error::CoreError;
use crate::model::{BlockKey, Layout};
use crate::util::print_json;

pub fn run(args: AnnotateArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let engine = workspace.engine();
    let file = GridFile::open(&args.grid)?;
    let layout = current_layout(&engine, &workspace.layouts, &file, false)?;

    let key = resolve_key(&layout, args.block_key.as_deref(), args.index)?;
    let previous = layout
        .find(key)
        .and_then(|block| block.annotation.clone())
        .unwrap_or_default();
    let layout = engine
        .annotate(&layout, key, &args.label)
        .with_context(|| format!("failed to annotate {}", args.grid.display()))?;
    workspace.layouts.store(&file.sha256, &file.path, &layout)?;

    info!(
        grid = %args.grid.display(),
        key = %key,
        label = args.label.trim(),
        previous = %previous,
        "block annotated"
    );
    print_json(&LayoutOutput::new(&file, &layout))
}

fn resolve_key(layout: &Layout, block_key: Option<&str>, index: Option<usize>) -> Result<BlockKey> {
    if let Some(raw) = block_key {
        return Ok(raw.parse::<BlockKey>()?);
    }
    let index = index.context("either --block-key or --index is required")?;
    let key = layout
        .key_at(index)
        .ok_or_else(|| CoreError::AnnotationTargetMissing(format!("#{index}")))?;
    Ok(key)
}
