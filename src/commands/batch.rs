use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::annotate::transplant;
use crate::cli::BatchArgs;
use crate::commands::Workspace;
use crate::commands::session::GridFile;
use crate::matching::BlockPair;
use crate::model::Layout;
use crate::service::{BatchEntry, BatchInput};
use crate::store::Template;
use crate::util::print_json;

#[derive(Debug, Serialize)]
struct BatchRecord {
    filename: String,
    matched_template_id: Option<String>,
    template_name: Option<String>,
    score: Option<f64>,
    confident: bool,
    blocks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<BatchError>,
}

#[derive(Debug, Serialize)]
struct BatchError {
    kind: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    templates: usize,
    results: Vec<BatchRecord>,
}

pub fn run(args: BatchArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let engine = workspace.engine();
    let templates = candidate_templates(&workspace, &args.templates)?;

    let mut digests = Vec::with_capacity(args.grids.len());
    let inputs = args
        .grids
        .iter()
        .map(|path| {
            let (sha256, grid) = GridFile::try_open(path);
            digests.push(sha256);
            BatchInput {
                filename: path.display().to_string(),
                grid,
            }
        })
        .collect::<Vec<_>>();

    info!(
        files = inputs.len(),
        templates = templates.len(),
        "batch match started"
    );
    let entries = engine.batch_match(inputs, &templates);

    let mut results = Vec::with_capacity(entries.len());
    let mut failed = 0usize;
    let mut transplanted = 0usize;
    for ((entry, sha256), path) in entries.into_iter().zip(digests).zip(&args.grids) {
        if entry.outcome.is_err() {
            failed += 1;
        }
        if cache_confident(&workspace, &templates, &entry, sha256, path)? {
            transplanted += 1;
        }
        results.push(record(entry));
    }

    info!(
        files = results.len(),
        failed,
        transplanted,
        "batch match complete"
    );
    print_json(&BatchOutput {
        templates: templates.len(),
        results,
    })
}

fn candidate_templates(workspace: &Workspace, selected: &[String]) -> Result<Vec<Template>> {
    if selected.is_empty() {
        return Ok(workspace.store.load_all()?);
    }

    selected
        .iter()
        .map(|id_or_name| {
            workspace
                .store
                .load(id_or_name)
                .with_context(|| format!("failed to load template {id_or_name}"))
        })
        .collect()
}

/// Carries annotations onto a confidently matched file and caches the result.
/// An existing cached layout for the file is the base, so earlier labels stay.
fn cache_confident(
    workspace: &Workspace,
    templates: &[Template],
    entry: &BatchEntry,
    sha256: Option<String>,
    path: &Path,
) -> Result<bool> {
    let Ok(outcome) = &entry.outcome else {
        return Ok(false);
    };
    let Some(best) = outcome.best.as_ref().filter(|best| best.confident) else {
        return Ok(false);
    };
    let Some(template) = templates
        .iter()
        .find(|template| template.template_id == best.template_id)
    else {
        return Ok(false);
    };
    let Some(sha256) = sha256 else {
        warn!(grid = %path.display(), "grid digest unavailable, layout not cached");
        return Ok(false);
    };

    let layout = match workspace.layouts.load(&sha256)? {
        Some(cached) => fill_unlabelled(&cached, template, &best.pairs),
        None => transplant(&outcome.layout, template, &best.pairs),
    };
    workspace.layouts.store(&sha256, path, &layout)?;
    Ok(true)
}

/// Template labels only fill blocks the file has no label for yet.
fn fill_unlabelled(cached: &Layout, template: &Template, pairs: &[BlockPair]) -> Layout {
    let mut merged = transplant(cached, template, pairs);
    for (block, existing) in merged.blocks.iter_mut().zip(&cached.blocks) {
        if existing.annotation.is_some() {
            block.annotation = existing.annotation.clone();
        }
    }
    merged
}

fn record(entry: BatchEntry) -> BatchRecord {
    match entry.outcome {
        Ok(outcome) => {
            let blocks = Some(outcome.layout.len());
            match outcome.best {
                Some(best) => BatchRecord {
                    filename: entry.filename,
                    matched_template_id: Some(best.template_id),
                    template_name: best.template_name,
                    score: Some(best.score),
                    confident: best.confident,
                    blocks,
                    error: None,
                },
                None => BatchRecord {
                    filename: entry.filename,
                    matched_template_id: None,
                    template_name: None,
                    score: None,
                    confident: false,
                    blocks,
                    error: None,
                },
            }
        }
        Err(err) => {
            warn!(file = %entry.filename, kind = err.kind(), error = %err, "batch file failed");
            BatchRecord {
                filename: entry.filename,
                matched_template_id: None,
                template_name: None,
                score: None,
                confident: false,
                blocks: None,
                error: Some(BatchError {
                    kind: err.kind(),
                    message: err.to_string(),
                }),
            }
        }
    }
}
