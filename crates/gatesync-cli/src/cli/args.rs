//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use gatesync_engine::DEFAULT_PREFIX;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Keep DNS gateway block lists in sync with domain feeds
///
/// Downloads the configured block and allow lists, normalizes them into one
/// domain set, and converges the gateway's lists and blocking rule to it.
///
/// Credentials are read from CF_API_TOKEN and CF_IDENTIFIER, in the
/// environment or the env file.
#[derive(Parser, Debug)]
#[command(name = "gatesync")]
#[command(author, version, about, long_about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Name prefix of managed lists and rules
    #[arg(long, global = true, env = "GATESYNC_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Domains per list (the gateway allows at most 1000)
    #[arg(
        long,
        global = true,
        env = "GATESYNC_CHUNK_SIZE",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u16).range(1..=1000)
    )]
    pub chunk_size: u16,

    /// Dotenv-style file with credentials
    #[arg(long, global = true, env = "GATESYNC_ENV_FILE", default_value = ".env")]
    pub env_file: PathBuf,

    /// Directory holding the seed source files
    #[arg(long, global = true, env = "GATESYNC_LISTS_DIR", default_value = "lists")]
    pub lists_dir: PathBuf,

    /// Minimum milliseconds between mutating API calls
    #[arg(long, global = true, env = "GATESYNC_RATE_INTERVAL_MS", default_value_t = 1000)]
    pub rate_interval_ms: u64,

    /// Retries for transient API and download failures
    #[arg(long, global = true, env = "GATESYNC_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Gateway API base URL
    #[arg(long, global = true, env = "GATESYNC_API_URL", hide = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Log debug details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one full synchronization pass
    Run,

    /// Show what a pass would change without changing anything
    Plan,

    /// Delete every list and rule under the prefix
    Purge(PurgeArgs),
}

#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Confirm deletion
    #[arg(long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gatesync", "run"]).unwrap();
        assert_eq!(cli.global.prefix, DEFAULT_PREFIX);
        assert_eq!(cli.global.chunk_size, 1000);
        assert_eq!(cli.global.max_retries, 3);
        assert!(matches!(cli.command, Commands::Run));
    }

    #[test]
    fn test_chunk_size_bounds() {
        assert!(Cli::try_parse_from(["gatesync", "plan", "--chunk-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["gatesync", "plan", "--chunk-size", "1001"]).is_err());
        let cli = Cli::try_parse_from(["gatesync", "plan", "--chunk-size", "250"]).unwrap();
        assert_eq!(cli.global.chunk_size, 250);
    }

    #[test]
    fn test_purge_flags() {
        let cli = Cli::try_parse_from(["gatesync", "purge", "--yes", "-o", "json"]).unwrap();
        assert!(matches!(cli.command, Commands::Purge(PurgeArgs { yes: true })));
        assert_eq!(cli.global.output, OutputFormat::Json);
    }
}
