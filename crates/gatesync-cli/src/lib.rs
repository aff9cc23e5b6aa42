//! # gatesync-cli
//!
//! Command-line front end for the gateway list synchronizer.
//!
//! ## Commands
//!
//! - **run**: one full reconciliation pass
//! - **plan**: compute and print the pass without changing anything
//! - **purge**: delete every managed list and rule
//!
//! Exit status is `0` when fully synced, `1` on configuration or fatal errors
//! and `2` when some operations failed or were skipped.

pub mod cli;
pub mod config;
pub mod logging;
pub mod output;

pub use cli::run;
