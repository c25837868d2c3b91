use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ApplyArgs;
use crate::commands::session::GridFile;
use crate::commands::{LayoutOutput, Workspace};
use crate::error::CoreError;
use crate::matching::MatchResult;
use crate::util::print_json;

#[derive(Debug, Serialize)]
struct ApplyOutput {
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<MatchResult>,
    #[serde(flatten)]
    layout: LayoutOutput,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let engine = workspace.engine();
    let file = GridFile::open(&args.grid)?;

    let output = match engine.apply_template(&file.grid, &args.template) {
        Ok(applied) => {
            workspace.layouts.store(&file.sha256, &file.path, &applied.layout)?;
            info!(
                grid = %args.grid.display(),
                template_id = %applied.result.template_id,
                score = applied.result.score,
                "template applied"
            );
            ApplyOutput {
                matched: true,
                layout: LayoutOutput::new(&file, &applied.layout),
                result: Some(applied.result),
            }
        }
        Err(CoreError::NoConfidentMatch {
            template_id,
            score,
            threshold,
        }) if args.fallback_detect => {
            warn!(
                grid = %args.grid.display(),
                template_id = %template_id,
                score,
                threshold,
                "no confident match, falling back to plain detection"
            );
            let layout = engine.detect(&file.grid)?;
            ApplyOutput {
                matched: false,
                result: None,
                layout: LayoutOutput::new(&file, &layout),
            }
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!(
                    "failed to apply template {} to {}",
                    args.template,
                    args.grid.display()
                )
            });
        }
    };

    print_json(&output)
}
