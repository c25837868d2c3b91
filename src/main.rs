mod annotate;
mod cli;
mod commands;
mod config;
mod error;
mod export;
mod fingerprint;
mod ingest;
mod matching;
mod model;
mod segment;
mod service;
mod store;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => commands::detect::run(args),
        Commands::Annotate(args) => commands::annotate::run(args),
        Commands::SaveTemplate(args) => commands::template::save(args),
        Commands::LoadTemplate(args) => commands::template::load(args),
        Commands::ListTemplates(args) => commands::template::list(args),
        Commands::RenameTemplate(args) => commands::template::rename(args),
        Commands::Apply(args) => commands::apply::run(args),
        Commands::Batch(args) => commands::batch::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
