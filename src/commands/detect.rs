use anyhow::Result;
use tracing::info;

use crate::cli::DetectArgs;
use crate::commands::session::{GridFile, current_layout};
use crate::commands::{LayoutOutput, Workspace};
use crate::util::print_json;

pub fn run(args: DetectArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let file = GridFile::open(&args.grid)?;
    let layout = current_layout(&workspace.engine(), &workspace.layouts, &file, args.fresh)?;

    for (index, block) in layout.blocks.iter().enumerate() {
        info!(
            index,
            key = %block.key(),
            annotation = block.annotation.as_deref().unwrap_or(""),
            "block"
        );
    }
    info!(grid = %args.grid.display(), blocks = layout.len(), "detection complete");

    print_json(&LayoutOutput::new(&file, &layout))
}
