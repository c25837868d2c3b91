use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigOverrides, ScoringKind};

#[derive(Parser, Debug)]
#[command(
    name = "gridprint",
    version,
    about = "Spreadsheet block detection, annotation and template matching"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Detect(DetectArgs),
    Annotate(AnnotateArgs),
    SaveTemplate(SaveTemplateArgs),
    LoadTemplate(LoadTemplateArgs),
    ListTemplates(ListTemplatesArgs),
    RenameTemplate(RenameTemplateArgs),
    Apply(ApplyArgs),
    Batch(BatchArgs),
    Export(ExportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    #[arg(long, default_value = ".cache/gridprint")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub max_cells: Option<u64>,

    #[arg(long)]
    pub min_overlap: Option<f64>,

    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, value_enum)]
    pub strategy: Option<ScoringKind>,
}

impl EngineArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_cells: self.max_cells,
            min_overlap: self.min_overlap,
            threshold: self.threshold,
            strategy: self.strategy,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub grid: PathBuf,

    #[arg(long, default_value_t = false)]
    pub fresh: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub grid: PathBuf,

    #[arg(long, conflicts_with = "index", required_unless_present = "index")]
    pub block_key: Option<String>,

    #[arg(long)]
    pub index: Option<usize>,

    #[arg(long)]
    pub label: String,
}

#[derive(Args, Debug, Clone)]
pub struct SaveTemplateArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub grid: PathBuf,

    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LoadTemplateArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    pub id_or_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListTemplatesArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RenameTemplateArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    pub id_or_name: String,

    pub new_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub grid: PathBuf,

    #[arg(long)]
    pub template: String,

    /// On a low-confidence match, emit the plain detected layout instead of failing.
    #[arg(long, default_value_t = false)]
    pub fallback_detect: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long = "grid", required = true)]
    pub grids: Vec<PathBuf>,

    #[arg(long = "template")]
    pub templates: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[arg(long)]
    pub grid: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}
