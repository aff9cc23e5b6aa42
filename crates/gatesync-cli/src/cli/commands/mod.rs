//! Command implementations.

pub mod plan;
pub mod purge;
pub mod run;

use anyhow::{Context as _, Result};
use gatesync_client::GatewayClient;
use gatesync_engine::{RawLists, SourceLoader, SyncReport};
use std::process::ExitCode;

use crate::cli::args::GlobalArgs;
use crate::config::Settings;
use crate::output::OutputFormat;

/// Exit status for a pass that left some operations undone
const PARTIAL_SYNC: u8 = 2;

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    pub settings: Settings,
    pub client: GatewayClient,
    pub output_format: OutputFormat,
}

impl Context {
    /// Resolve settings and build the client. Fails before any network call.
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let settings = Settings::load(args)?;
        let client = settings
            .client()
            .context("failed to create gateway client")?;
        Ok(Self {
            settings,
            client,
            output_format: args.output,
        })
    }

    /// Download and aggregate the configured sources
    pub async fn load_sources(&self) -> Result<RawLists> {
        let loader = SourceLoader::new(self.settings.retry.clone())?;
        Ok(loader.load_raw_lists(&self.settings.sources()).await)
    }
}

/// Map a finished pass to the process exit status
pub fn exit_code(report: &SyncReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(PARTIAL_SYNC)
    }
}
