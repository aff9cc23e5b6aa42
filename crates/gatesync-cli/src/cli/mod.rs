//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use std::process::ExitCode;

/// Run the CLI application.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.global.no_color {
        colored::control::set_override(false);
    }
    crate::logging::init(cli.global.verbose, cli.global.no_color)?;

    match cli.command {
        Commands::Run => commands::run::execute(&cli.global).await,
        Commands::Plan => commands::plan::execute(&cli.global).await,
        Commands::Purge(args) => commands::purge::execute(&cli.global, args).await,
    }
}
