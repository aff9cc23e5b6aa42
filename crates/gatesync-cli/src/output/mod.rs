//! Output formatting for plans and sync reports.

use clap::ValueEnum;
use colored::Colorize;
use gatesync_engine::{
    ExecutionReport, NormalizeStats, Operation, OperationPlan, Outcome, SyncPlan, SyncReport,
};
use serde::{Deserialize, Serialize};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Print a computed plan
pub fn print_plan(planned: &SyncPlan, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(planned)?),
        OutputFormat::Pretty => {
            print_inputs(&planned.stats, planned);
            print_operations(&planned.plan);
        }
    }
    Ok(())
}

/// Print an executed pass
pub fn print_report(report: &SyncReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Pretty => {
            print_inputs(&report.planned.stats, &report.planned);
            print_execution(&report.execution);
        }
    }
    Ok(())
}

fn print_inputs(stats: &NormalizeStats, planned: &SyncPlan) {
    println!("{}", "Domains".bold());
    println!("  {:<14} {}", "blocked:", stats.blocked);
    println!("  {:<14} {}", "allowed:", stats.allowed);
    println!("  {:<14} {}", "allow-listed:", stats.allow_listed);
    println!("  {:<14} {}", "discarded:", stats.discarded);
    println!("  {:<14} {}", "final:", stats.total.to_string().cyan().bold());
    println!();
    println!("{}", "Gateway".bold());
    println!("  {:<14} {}", "lists wanted:", planned.chunks);
    println!(
        "  {:<14} {} ({} domains)",
        "lists found:", planned.remote_lists, planned.remote_items
    );
    println!();
}

fn print_operations(plan: &OperationPlan) {
    if plan.is_empty() {
        println!("{}", "Already in sync, nothing to do.".green());
        return;
    }
    println!("{} ({})", "Planned operations".bold(), plan.len());
    for op in plan {
        println!("  {} {op}", marker(op));
    }
}

fn print_execution(report: &ExecutionReport) {
    if report.results.is_empty() {
        println!("{}", "Already in sync, nothing to do.".green());
        return;
    }
    println!("{}", "Operations".bold());
    for result in &report.results {
        let outcome = match result.outcome {
            Outcome::Success => result.outcome.to_string().green(),
            Outcome::Failed => result.outcome.to_string().red().bold(),
            Outcome::Skipped => result.outcome.to_string().yellow(),
        };
        print!("  {:<8} {}", outcome, result.operation);
        match (&result.outcome, &result.detail) {
            (Outcome::Success, _) | (_, None) => println!(),
            (_, Some(detail)) => println!(" {}", format!("({detail})").dimmed()),
        }
    }
    println!();

    let summary = format!(
        "{} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    if report.is_complete() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.yellow().bold());
    }
}

fn marker(op: &Operation) -> colored::ColoredString {
    match op {
        Operation::CreateList { .. } | Operation::CreateRule { .. } => "+".green(),
        Operation::UpdateList { .. } | Operation::UpdateRule { .. } => "~".yellow(),
        Operation::DeleteList { .. } | Operation::DeleteRule { .. } => "-".red(),
    }
}
