//! Batch command implementation.

use crate::cli::commands::execute::cancel_on_ctrl_c;
use crate::core::batch::{run_batch, save_batch_report, BatchOptions, FolderStatus};
use crate::models::config::Config;
use crate::services::resolver::MetadataResolver;
use crate::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Process many library folders in parallel.
pub async fn batch<R: MetadataResolver + 'static>(
    paths: &[PathBuf],
    options: BatchOptions,
    report_path: Option<&Path>,
    config: Arc<Config>,
    resolver: Arc<R>,
) -> Result<()> {
    println!("{}", "[BATCH] Organizing libraries...".bold().cyan());
    println!("  {} {}", "Folders:".bold(), paths.len());
    println!("  {} {}", "Parallel jobs:".bold(), options.concurrency);
    if let Some(dir) = &options.log_dir {
        println!("  {} {}", "Log directory:".bold(), dir.display());
    }
    println!();

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let report = run_batch(paths, &options, config, resolver, cancel).await;

    for folder in &report.folders {
        let tag = match folder.status {
            FolderStatus::Success => "[OK]".green(),
            FolderStatus::PartialFailure => "[PARTIAL]".yellow(),
            FolderStatus::TotalFailure => "[FAILED]".red(),
            FolderStatus::Cancelled => "[CANCELLED]".dimmed(),
        };
        println!("  {} {} ({})", tag, folder.folder.display(), folder.stats);
        if let Some(error) = &folder.error {
            println!("      {}", error.red());
        }
        if let Some(log) = &folder.log_file {
            println!("      {} {}", "log:".dimmed(), log.display());
        }
    }

    let summary = report.summary();
    println!();
    println!("{}", "[Batch Summary]".bold().green());
    println!("  {} {}", "Succeeded:".bold(), summary.succeeded);
    println!("  {} {}", "Partial:".bold(), summary.partial);
    println!("  {} {}", "Failed:".bold(), summary.failed);
    println!("  {} {}", "Cancelled:".bold(), summary.cancelled);
    println!("  {} {}", "Operations:".bold(), summary.stats);

    if let Some(report_path) = report_path {
        save_batch_report(&report, report_path)?;
        println!(
            "{} {}",
            "[OK] Report saved to:".bold().green(),
            report_path.display()
        );
    }

    if options.dry_run {
        println!();
        println!(
            "{}",
            "[DRY RUN] Nothing was changed. Re-run with --apply to apply.".yellow()
        );
    }

    Ok(())
}
