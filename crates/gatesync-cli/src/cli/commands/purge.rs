//! `gatesync purge` - Delete every managed list and rule.

use anyhow::{bail, Result};
use gatesync_engine::Synchronizer;
use std::process::ExitCode;

use super::{exit_code, Context};
use crate::cli::args::{GlobalArgs, PurgeArgs};
use crate::output::print_report;

pub async fn execute(args: &GlobalArgs, purge: PurgeArgs) -> Result<ExitCode> {
    if !purge.yes {
        bail!(
            "purge deletes every list and rule named '{}*'; pass --yes to confirm",
            args.prefix
        );
    }
    let ctx = Context::new(args)?;

    let sync = Synchronizer::new(&ctx.client, ctx.settings.sync.clone());
    let report = sync.purge().await?;

    print_report(&report, ctx.output_format)?;
    Ok(exit_code(&report))
}
