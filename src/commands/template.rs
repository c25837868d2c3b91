use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::{ListTemplatesArgs, LoadTemplateArgs, RenameTemplateArgs, SaveTemplateArgs};
use crate::commands::Workspace;
use crate::commands::session::{GridFile, current_layout};
use crate::model::Layout;
use crate::store::{Template, TemplateSummary};
use crate::util::print_json;

#[derive(Debug, Serialize)]
struct TemplateOutput<'a> {
    template_id: &'a str,
    name: Option<&'a str>,
    created_at: &'a str,
    sequence: i64,
    shape_digest: &'a str,
    block_count: usize,
    layout: &'a Layout,
}

impl<'a> From<&'a Template> for TemplateOutput<'a> {
    fn from(template: &'a Template) -> Self {
        Self {
            template_id: &template.template_id,
            name: template.name.as_deref(),
            created_at: &template.created_at,
            sequence: template.sequence,
            shape_digest: &template.fingerprint.shape_digest,
            block_count: template.fingerprint.block_count,
            layout: &template.layout,
        }
    }
}

pub fn save(args: SaveTemplateArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let engine = workspace.engine();
    let file = GridFile::open(&args.grid)?;
    let layout = current_layout(&engine, &workspace.layouts, &file, false)?;

    let template = engine
        .save_template(&layout, args.name.as_deref())
        .with_context(|| format!("failed to save template from {}", args.grid.display()))?;
    print_json(&TemplateOutput::from(&template))
}

pub fn load(args: LoadTemplateArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let template = workspace.engine().load_template(&args.id_or_name)?;
    info!(
        template_id = %template.template_id,
        blocks = template.layout.len(),
        "template loaded"
    );
    print_json(&TemplateOutput::from(&template))
}

pub fn list(args: ListTemplatesArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let templates: Vec<TemplateSummary> = workspace.store.list()?;
    info!(templates = templates.len(), "templates listed");
    print_json(&templates)
}

pub fn rename(args: RenameTemplateArgs) -> Result<()> {
    let workspace = Workspace::open(&args.engine)?;
    let template = workspace
        .store
        .rename(&args.id_or_name, &args.new_name)
        .with_context(|| format!("failed to rename template {}", args.id_or_name))?;
    info!(
        template_id = %template.template_id,
        name = template.name.as_deref().unwrap_or(""),
        "template renamed"
    );
    print_json(&TemplateOutput::from(&template))
}
