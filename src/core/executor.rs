//! Plan executor module.
//!
//! Applies operations in planned order:
//! - create_directory: Create destination folders
//! - rename / move: Relocate files (atomic rename, copy+verify across filesystems)
//! - delete: Remove files and directories left empty
//!
//! Every operation ends in exactly one outcome; a failure is recorded and
//! execution continues with the next operation.

use crate::models::plan::{
    ExecutionReport, ExecutionStats, Operation, OperationOutcome, OperationResult, OperationType,
};
use crate::utils::hash;
use crate::Result;
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Whether to verify checksums after cross-filesystem moves.
    pub verify_checksum: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
        }
    }
}

/// What an applied operation did, for stats.
enum Applied {
    File,
    Directory,
}

/// Plan executor.
#[derive(Debug, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Create a new executor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new executor with custom configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Execute operations in order.
    ///
    /// In dry-run mode every operation is `Simulated` and the filesystem is
    /// not touched. Once `cancel` fires, the remaining operations are
    /// `Skipped("cancelled")`.
    pub fn execute(
        &self,
        operations: &[Operation],
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let total = operations.len();
        tracing::info!(
            "Executing {} operations{}",
            total,
            if dry_run { " (dry run)" } else { "" }
        );

        let mut stats = ExecutionStats::default();
        let mut results = Vec::with_capacity(total);

        for (idx, op) in operations.iter().enumerate() {
            let outcome = if cancel.is_cancelled() {
                OperationOutcome::Skipped {
                    reason: "cancelled".to_string(),
                }
            } else if dry_run {
                tracing::info!(outcome = "simulated", "[{}/{}] {}", idx + 1, total, op);
                OperationOutcome::Simulated
            } else {
                match self.execute_operation(op) {
                    Ok(Some(applied)) => {
                        stats.record_applied(op.op, matches!(applied, Applied::Directory));
                        tracing::info!(outcome = "applied", "[{}/{}] {}", idx + 1, total, op);
                        OperationOutcome::Applied
                    }
                    Ok(None) => OperationOutcome::Skipped {
                        reason: skip_reason(op),
                    },
                    Err(e) => {
                        tracing::error!(
                            outcome = "failed",
                            "[{}/{}] {}: {}",
                            idx + 1,
                            total,
                            op,
                            e
                        );
                        OperationOutcome::Failed {
                            cause: e.to_string(),
                        }
                    }
                }
            };

            match &outcome {
                OperationOutcome::Simulated => stats.simulated += 1,
                OperationOutcome::Failed { .. } => stats.failed += 1,
                OperationOutcome::Skipped { reason } => {
                    tracing::warn!(outcome = "skipped", "{}: {}", op, reason);
                    stats.skipped += 1;
                }
                OperationOutcome::Applied => {}
            }

            results.push(OperationResult {
                operation: op.clone(),
                outcome,
            });
        }

        tracing::info!("Execution finished: {}", stats);
        ExecutionReport { results, stats }
    }

    /// Execute a single operation. `Ok(None)` means nothing needed doing.
    fn execute_operation(&self, op: &Operation) -> Result<Option<Applied>> {
        match op.op {
            OperationType::CreateDirectory => self.execute_mkdir(op),
            OperationType::Rename | OperationType::Move => self.execute_move(op),
            OperationType::Delete => self.execute_delete(op),
        }
    }

    /// Execute create_directory operation.
    fn execute_mkdir(&self, op: &Operation) -> Result<Option<Applied>> {
        let path = op.to.as_ref().ok_or_else(|| {
            crate::Error::OperationFailed(
                "create_directory operation missing 'to' path".to_string(),
            )
        })?;

        if path.is_dir() {
            tracing::debug!("Directory already exists: {:?}", path);
            return Ok(None);
        }

        fs::create_dir_all(path)?;
        tracing::debug!("Created directory: {:?}", path);
        Ok(Some(Applied::Directory))
    }

    /// Execute rename / move operation.
    ///
    /// Same-filesystem moves use an atomic rename. Cross-filesystem moves copy,
    /// verify the checksum and only then delete the source.
    fn execute_move(&self, op: &Operation) -> Result<Option<Applied>> {
        let from = op.from.as_ref().ok_or_else(|| {
            crate::Error::OperationFailed("Move operation missing 'from' path".to_string())
        })?;
        let to = op.to.as_ref().ok_or_else(|| {
            crate::Error::OperationFailed("Move operation missing 'to' path".to_string())
        })?;

        if fs::symlink_metadata(from).is_err() {
            return Err(crate::Error::PathNotFound(from.display().to_string()));
        }
        let case_only =
            from.to_string_lossy().to_lowercase() == to.to_string_lossy().to_lowercase();
        if !case_only && fs::symlink_metadata(to).is_ok() {
            return Err(crate::Error::Collision(format!(
                "Destination already exists: {}",
                to.display()
            )));
        }

        // Create parent directory if needed
        if let Some(parent) = to.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // Try atomic rename first (same filesystem, instant)
        match fs::rename(from, to) {
            Ok(()) => {
                tracing::debug!("Moved (rename): {:?} -> {:?}", from, to);
                return Ok(Some(Applied::File));
            }
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                tracing::debug!("Cross-filesystem move detected, using copy+delete");
            }
            Err(e) => {
                return Err(crate::Error::OperationFailed(format!(
                    "Failed to move {:?}: {}",
                    from, e
                )));
            }
        }

        self.copy_and_remove(from, to)?;
        Ok(Some(Applied::File))
    }

    /// Cross-filesystem move: copy with optional checksum verification.
    fn copy_and_remove(&self, from: &Path, to: &Path) -> Result<()> {
        let checksum = if self.config.verify_checksum {
            Some(hash::sha256_file(from)?)
        } else {
            None
        };

        fs::copy(from, to)?;

        if let Some(original_checksum) = checksum {
            let new_checksum = hash::sha256_file(to)?;
            if original_checksum != new_checksum {
                // Remove incomplete copy
                let _ = fs::remove_file(to);
                return Err(crate::Error::OperationFailed(format!(
                    "Checksum mismatch after copying: {:?}",
                    to
                )));
            }
        }

        // Delete original after successful copy
        fs::remove_file(from)?;
        tracing::debug!("Moved (copy+delete): {:?} -> {:?}", from, to);
        Ok(())
    }

    /// Execute delete operation. Directories are only removed when empty.
    fn execute_delete(&self, op: &Operation) -> Result<Option<Applied>> {
        let path = op.from.as_ref().ok_or_else(|| {
            crate::Error::OperationFailed("Delete operation missing 'from' path".to_string())
        })?;

        let metadata = fs::symlink_metadata(path)
            .map_err(|_| crate::Error::PathNotFound(path.display().to_string()))?;

        if metadata.is_dir() {
            let is_empty = fs::read_dir(path)?.next().is_none();
            if !is_empty {
                return Ok(None);
            }
            fs::remove_dir(path)?;
            tracing::debug!("Removed empty directory: {:?}", path);
            Ok(Some(Applied::Directory))
        } else {
            fs::remove_file(path)?;
            tracing::debug!("Deleted: {:?}", path);
            Ok(Some(Applied::File))
        }
    }
}

fn skip_reason(op: &Operation) -> String {
    match op.op {
        OperationType::CreateDirectory => "directory already exists".to_string(),
        OperationType::Delete => "directory not empty".to_string(),
        _ => "nothing to do".to_string(),
    }
}

/// Execute operations with the default executor and no cancellation.
pub fn execute_operations(operations: &[Operation], dry_run: bool) -> ExecutionReport {
    Executor::new().execute(operations, dry_run, &CancellationToken::new())
}

/// Save an execution report to a JSON file.
pub fn save_report(report: &ExecutionReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    tracing::info!("Report saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_executor_config_default() {
        let config = ExecutorConfig::default();
        assert!(config.verify_checksum);
    }

    #[test]
    fn test_execute_empty() {
        let report = execute_operations(&[], false);
        assert!(report.results.is_empty());
        assert_eq!(report.stats.total(), 0);
    }

    #[test]
    fn test_existing_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        let ops = vec![Operation::create_directory(dir.path().to_path_buf(), "test")];
        let report = execute_operations(&ops, false);
        assert_eq!(report.stats.skipped, 1);
        assert!(matches!(report.results[0].outcome, OperationOutcome::Skipped { .. }));
    }

    #[test]
    fn test_non_empty_directory_is_not_removed() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("keep");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("file.txt"), "x").unwrap();

        let report = execute_operations(&[Operation::delete(sub.clone(), "test")], false);
        assert_eq!(report.stats.skipped, 1);
        assert!(sub.join("file.txt").exists());
    }

    #[test]
    fn test_cancelled_token_skips_everything() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mkv");
        fs::write(&file, "x").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let ops = vec![Operation::delete(file.clone(), "test")];
        let report = Executor::new().execute(&ops, false, &cancel);

        assert_eq!(report.stats.skipped, 1);
        assert_eq!(
            report.results[0].outcome,
            OperationOutcome::Skipped {
                reason: "cancelled".to_string()
            }
        );
        assert!(file.exists());
    }

    #[test]
    fn test_copy_and_remove_verifies() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from.mkv");
        let to = dir.path().join("to.mkv");
        fs::write(&from, "video bytes").unwrap();

        Executor::new().copy_and_remove(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "video bytes");
    }
}
