//! gatesync - keep DNS gateway block lists in sync with domain feeds.

use anyhow::Result;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    gatesync_cli::run().await
}
