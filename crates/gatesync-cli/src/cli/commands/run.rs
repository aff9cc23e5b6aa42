//! `gatesync run` - One full synchronization pass.

use anyhow::Result;
use gatesync_engine::Synchronizer;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};

use super::{exit_code, Context};
use crate::cli::args::GlobalArgs;
use crate::output::print_report;

pub async fn execute(args: &GlobalArgs) -> Result<ExitCode> {
    let ctx = Context::new(args)?;
    let started = Instant::now();

    let raw = ctx.load_sources().await?;
    let sync = Synchronizer::new(&ctx.client, ctx.settings.sync.clone());
    let report = sync.run(&raw).await?;

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if report.is_complete() {
        info!(elapsed_ms, "sync complete");
    } else {
        warn!(
            elapsed_ms,
            failed = report.execution.failed(),
            skipped = report.execution.skipped(),
            "sync incomplete"
        );
    }

    print_report(&report, ctx.output_format)?;
    Ok(exit_code(&report))
}
