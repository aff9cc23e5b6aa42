//! `gatesync plan` - Show what a pass would change.

use anyhow::Result;
use gatesync_engine::Synchronizer;
use std::process::ExitCode;

use super::Context;
use crate::cli::args::GlobalArgs;
use crate::output::print_plan;

pub async fn execute(args: &GlobalArgs) -> Result<ExitCode> {
    let ctx = Context::new(args)?;

    let raw = ctx.load_sources().await?;
    let sync = Synchronizer::new(&ctx.client, ctx.settings.sync.clone());
    let planned = sync.prepare(&raw).await?;

    print_plan(&planned, ctx.output_format)?;
    Ok(ExitCode::SUCCESS)
}
