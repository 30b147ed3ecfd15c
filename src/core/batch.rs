//! Batch orchestration.
//!
//! Runs the scan → detect → plan → execute pipeline over many independent
//! library folders with bounded parallelism. Each folder logs to its own
//! file; the caller awaiting the join handles is the only aggregator.

use crate::core::executor::Executor;
use crate::core::planner::{blocking, Planner};
use crate::models::config::Config;
use crate::models::plan::{ExecutionReport, ExecutionStats, IssueKind, Plan, PlanIssue};
use crate::services::resolver::MetadataResolver;
use crate::utils::fs::sanitize_filename;
use crate::Result;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Batch run options.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum folders processed at once.
    pub concurrency: usize,
    /// Simulate every operation.
    pub dry_run: bool,
    /// Directory for per-folder log files. `None` disables them.
    pub log_dir: Option<PathBuf>,
    /// Show a progress bar on the terminal.
    pub show_progress: bool,
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.concurrency,
            dry_run: config.dry_run,
            log_dir: config.log_dir.clone(),
            show_progress: false,
        }
    }
}

/// Final state of one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderStatus {
    /// Every operation applied (or simulated) and no item was left out.
    Success,
    /// Some operations failed or some items collided.
    PartialFailure,
    /// The pipeline aborted or every operation failed.
    TotalFailure,
    /// Never started because the batch was cancelled.
    Cancelled,
}

/// Outcome of one folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderResult {
    pub folder: PathBuf,
    pub status: FolderStatus,
    pub stats: ExecutionStats,
    /// Number of planned operations.
    pub operations: usize,
    /// Items left out of the plan.
    pub issues: Vec<PlanIssue>,
    /// Per-folder log file, when logging to files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Pipeline error for `TotalFailure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FolderResult {
    fn cancelled(folder: PathBuf) -> Self {
        Self {
            folder,
            status: FolderStatus::Cancelled,
            stats: ExecutionStats::default(),
            operations: 0,
            issues: Vec::new(),
            log_file: None,
            error: None,
        }
    }

    fn failed(folder: PathBuf, error: String, log_file: Option<PathBuf>) -> Self {
        Self {
            folder,
            status: FolderStatus::TotalFailure,
            stats: ExecutionStats::default(),
            operations: 0,
            issues: Vec::new(),
            log_file,
            error: Some(error),
        }
    }
}

/// Aggregated batch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub folders: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub stats: ExecutionStats,
}

/// Results of a batch run, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub folders: Vec<FolderResult>,
}

impl BatchReport {
    /// Aggregate counters over every folder.
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            folders: self.folders.len(),
            ..Default::default()
        };
        for folder in &self.folders {
            match folder.status {
                FolderStatus::Success => summary.succeeded += 1,
                FolderStatus::PartialFailure => summary.partial += 1,
                FolderStatus::TotalFailure => summary.failed += 1,
                FolderStatus::Cancelled => summary.cancelled += 1,
            }
            summary.stats.merge(&folder.stats);
        }
        summary
    }
}

/// Run the whole pipeline for one folder.
pub async fn run_pipeline<R: MetadataResolver>(
    folder: &Path,
    config: &Config,
    resolver: &R,
    dry_run: bool,
    cancel: &CancellationToken,
) -> Result<(Plan, ExecutionReport)> {
    let plan = Planner::new(config, resolver).plan(folder).await?;

    let operations = plan.operations.clone();
    let cancel = cancel.clone();
    let report =
        blocking(move || Ok(Executor::new().execute(&operations, dry_run, &cancel))).await?;
    Ok((plan, report))
}

/// Status of a folder whose pipeline completed.
pub fn folder_status(stats: &ExecutionStats, issues: &[PlanIssue]) -> FolderStatus {
    let collided = issues.iter().any(|i| i.kind == IssueKind::Collision);
    if stats.failed > 0 && stats.failed == stats.total() {
        FolderStatus::TotalFailure
    } else if stats.failed > 0 || collided {
        FolderStatus::PartialFailure
    } else {
        FolderStatus::Success
    }
}

/// Per-folder log file name: `<YYYYmmdd_HHMMSS>_<NNN>_<folder-name>.log`.
pub fn log_file_name(started_at: &DateTime<Utc>, index: usize, folder: &Path) -> String {
    let name = folder
        .file_name()
        .map(|n| sanitize_filename(&n.to_string_lossy()).replace(' ', "_"))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "folder".to_string());
    format!(
        "{}_{:03}_{}.log",
        started_at.format("%Y%m%d_%H%M%S"),
        index,
        name
    )
}

/// Subscriber writing one folder's events to its own file.
fn folder_dispatch(log_dir: &Path, file_name: &str) -> Result<Dispatch> {
    fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(log_dir)
        .map_err(|e| crate::Error::other(format!("Cannot open log file: {}", e)))?;

    let subscriber = tracing_subscriber::fmt()
        .with_writer(appender)
        .with_ansi(false)
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    Ok(Dispatch::new(subscriber))
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

/// Process folders with at most `options.concurrency` running at once.
///
/// Folders not started before `cancel` fires are reported as `Cancelled`;
/// running folders skip their remaining operations.
pub async fn run_batch<R: MetadataResolver + 'static>(
    folders: &[PathBuf],
    options: &BatchOptions,
    config: Arc<Config>,
    resolver: Arc<R>,
    cancel: CancellationToken,
) -> BatchReport {
    let started_at = Utc::now();
    let concurrency = options.concurrency.max(1);
    tracing::info!(
        "Batch of {} folders, {} at a time{}",
        folders.len(),
        concurrency,
        if options.dry_run { " (dry run)" } else { "" }
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let pb = progress_bar(folders.len(), options.show_progress);
    let mut handles = Vec::with_capacity(folders.len());

    for (idx, folder) in folders.iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            tracing::warn!("Batch cancelled, not starting {:?}", folder);
            handles.push((folder.clone(), None));
            continue;
        };

        let mut log_file = None;
        let mut dispatch = None;
        if let Some(dir) = &options.log_dir {
            let file_name = log_file_name(&started_at, idx + 1, folder);
            match folder_dispatch(dir, &file_name) {
                Ok(d) => {
                    dispatch = Some(d);
                    log_file = Some(dir.join(file_name));
                }
                Err(e) => tracing::warn!("Logging {:?} to console only: {}", folder, e),
            }
        }

        let task_folder = folder.clone();
        let config = Arc::clone(&config);
        let resolver = Arc::clone(&resolver);
        let cancel = cancel.clone();
        let dry_run = options.dry_run;
        let pb = pb.clone();

        let task = async move {
            let _permit = permit;
            tracing::info!("Processing {:?}", task_folder);

            let outcome =
                run_pipeline(&task_folder, &config, resolver.as_ref(), dry_run, &cancel).await;
            let result = match outcome {
                Ok((plan, report)) => {
                    let status = folder_status(&report.stats, &plan.issues);
                    tracing::info!("Finished {:?}: {:?}, {}", task_folder, status, report.stats);
                    FolderResult {
                        folder: task_folder.clone(),
                        status,
                        stats: report.stats,
                        operations: plan.operations.len(),
                        issues: plan.issues,
                        log_file,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("Folder {:?} failed: {}", task_folder, e);
                    FolderResult::failed(task_folder.clone(), e.to_string(), log_file)
                }
            };

            pb.inc(1);
            result
        };

        let handle = match dispatch {
            Some(dispatch) => tokio::spawn(task.with_subscriber(dispatch)),
            None => tokio::spawn(task.instrument(tracing::info_span!("folder", index = idx + 1))),
        };
        handles.push((folder.clone(), Some(handle)));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (folder, handle) in handles {
        let result = match handle {
            None => FolderResult::cancelled(folder),
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => FolderResult::failed(folder, format!("Task failed: {}", e), None),
            },
        };
        tracing::debug!("{:?}: {:?}", result.folder, result.status);
        results.push(result);
    }

    pb.finish_and_clear();

    let report = BatchReport {
        started_at,
        finished_at: Utc::now(),
        dry_run: options.dry_run,
        folders: results,
    };
    let summary = report.summary();
    tracing::info!(
        "Batch finished: {} ok, {} partial, {} failed, {} cancelled ({})",
        summary.succeeded,
        summary.partial,
        summary.failed,
        summary.cancelled,
        summary.stats
    );
    report
}

/// Save a batch report to a JSON file.
pub fn save_batch_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    tracing::info!("Batch report saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            log_file_name(&at, 7, Path::new("/media/Movies A")),
            "20240305_140709_007_Movies_A.log"
        );
    }

    #[test]
    fn test_folder_status() {
        let ok = ExecutionStats {
            moved: 2,
            ..Default::default()
        };
        assert_eq!(folder_status(&ok, &[]), FolderStatus::Success);

        let partial = ExecutionStats {
            moved: 1,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(folder_status(&partial, &[]), FolderStatus::PartialFailure);

        let total = ExecutionStats {
            failed: 3,
            ..Default::default()
        };
        assert_eq!(folder_status(&total, &[]), FolderStatus::TotalFailure);

        let collision = PlanIssue {
            kind: IssueKind::Collision,
            path: PathBuf::from("/lib/a.mkv"),
            message: "taken".to_string(),
        };
        assert_eq!(folder_status(&ok, &[collision]), FolderStatus::PartialFailure);
    }

    #[test]
    fn test_summary_counts_statuses() {
        let now = Utc::now();
        let mut ok = FolderResult::cancelled(PathBuf::from("/a"));
        ok.status = FolderStatus::Success;
        ok.stats.renamed = 2;
        let report = BatchReport {
            started_at: now,
            finished_at: now,
            dry_run: false,
            folders: vec![
                ok,
                FolderResult::failed(PathBuf::from("/b"), "missing".to_string(), None),
                FolderResult::cancelled(PathBuf::from("/c")),
            ],
        };
        let summary = report.summary();
        assert_eq!(summary.folders, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.stats.renamed, 2);
    }
}
