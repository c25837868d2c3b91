use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ExportArgs;
use crate::commands::Workspace;
use crate::commands::session::{GridFile, current_layout};
use crate::util::ensure_directory;

pub fn run(args: ExportArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let engine = workspace.engine();
    let file = GridFile::open(&args.grid)?;
    let layout = current_layout(&engine, &workspace.layouts, &file, false)?;

    let bytes = engine
        .export_tabular(&layout, &file.grid)
        .with_context(|| format!("failed to export {}", args.grid.display()))?;

    match &args.output {
        Some(output) => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_directory(parent)?;
            }
            fs::write(output, &bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(
                grid = %args.grid.display(),
                output = %output.display(),
                blocks = layout.len(),
                bytes = bytes.len(),
                "export written"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&bytes)
                .context("failed to write export to stdout")?;
            stdout.flush().context("failed to flush stdout")?;
        }
    }

    Ok(())
}
