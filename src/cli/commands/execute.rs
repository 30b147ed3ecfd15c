//! Execute and run command implementations.

use crate::cli::commands::plan::print_plan;
use crate::core::batch::run_pipeline;
use crate::core::executor;
use crate::core::planner;
use crate::models::config::Config;
use crate::models::plan::{ExecutionReport, OperationOutcome};
use crate::services::resolver::MetadataResolver;
use crate::Result;
use colored::Colorize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Print execution counters and failures.
pub fn print_report(report: &ExecutionReport, dry_run: bool) {
    println!();
    println!("{}", "[Execution Summary]".bold().green());
    let stats = &report.stats;
    if dry_run {
        println!("  {} {}", "Simulated:".bold(), stats.simulated);
    } else {
        println!("  {} {}", "Renamed:".bold(), stats.renamed);
        println!("  {} {}", "Moved:".bold(), stats.moved);
        println!("  {} {}", "Deleted:".bold(), stats.deleted);
        println!("  {} {}", "Folders created:".bold(), stats.created);
        println!("  {} {}", "Empty folders removed:".bold(), stats.cleaned);
    }
    println!("  {} {}", "Skipped:".bold(), stats.skipped);
    println!("  {} {}", "Failed:".bold(), stats.failed);

    for result in &report.results {
        if let OperationOutcome::Failed { cause } = &result.outcome {
            println!("  {} {}: {}", "[FAILED]".red(), result.operation, cause);
        }
    }

    if dry_run {
        println!();
        println!(
            "{}",
            "[DRY RUN] Nothing was changed. Re-run with --apply to apply.".yellow()
        );
    }
}

/// Cancel `cancel` on Ctrl-C.
pub fn cancel_on_ctrl_c(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current operations...");
            cancel.cancel();
        }
    });
}

/// Execute a saved plan file.
pub fn execute_plan(plan_file: &Path, apply: bool) -> Result<()> {
    println!("{}", "[EXEC] Executing plan...".bold().cyan());
    println!();

    // Validate plan file exists
    if !plan_file.exists() {
        return Err(crate::Error::PathNotFound(plan_file.display().to_string()));
    }

    println!("[INFO] Loading plan: {}", plan_file.display());
    let plan = planner::load_plan(plan_file)?;
    println!("  {} {}", "Folder:".bold(), plan.root.display());
    println!("  {} {}", "Operations:".bold(), plan.operations.len());

    if apply {
        println!();
        println!("{}", "[WARNING] This will move and delete files!".bold().yellow());
    }

    let report = executor::execute_operations(&plan.operations, !apply);
    print_report(&report, !apply);
    Ok(())
}

/// Plan and execute one folder.
pub async fn run<R: MetadataResolver>(
    path: &Path,
    apply: bool,
    report_path: Option<&Path>,
    config: &Config,
    resolver: &R,
) -> Result<()> {
    let dry_run = !apply;
    println!("{}", "[RUN] Organizing library...".bold().cyan());
    println!("  {} {}", "Folder:".bold(), path.display());
    println!();

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let (plan, report) = run_pipeline(path, config, resolver, dry_run, &cancel).await?;
    print_plan(&plan);
    print_report(&report, dry_run);

    if let Some(report_path) = report_path {
        executor::save_report(&report, report_path)?;
        println!(
            "{} {}",
            "[OK] Report saved to:".bold().green(),
            report_path.display()
        );
    }

    Ok(())
}
