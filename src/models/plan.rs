//! Plan and execution data model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Plan for one library folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Plan version.
    pub version: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Library root the plan was computed for.
    pub root: PathBuf,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Items that could not be planned.
    pub issues: Vec<PlanIssue>,
}

impl Plan {
    /// Count operations of one type.
    pub fn count(&self, op: OperationType) -> usize {
        self.operations.iter().filter(|o| o.op == op).count()
    }
}

/// Filesystem operation. Pure data until executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation type.
    pub op: OperationType,
    /// Source path (rename, move, delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<PathBuf>,
    /// Destination path (create_directory, rename, move).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<PathBuf>,
    /// Human-readable reason.
    pub reason: String,
}

impl Operation {
    pub fn create_directory(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            op: OperationType::CreateDirectory,
            from: None,
            to: Some(path),
            reason: reason.into(),
        }
    }

    /// Rename when the parent directory is unchanged, move otherwise.
    pub fn relocate(from: PathBuf, to: PathBuf, reason: impl Into<String>) -> Self {
        let op = if from.parent() == to.parent() {
            OperationType::Rename
        } else {
            OperationType::Move
        };
        Self {
            op,
            from: Some(from),
            to: Some(to),
            reason: reason.into(),
        }
    }

    pub fn delete(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            op: OperationType::Delete,
            from: Some(path),
            to: None,
            reason: reason.into(),
        }
    }

    /// The path this operation is mainly about, for logs.
    pub fn subject(&self) -> &Path {
        self.from
            .as_deref()
            .or(self.to.as_deref())
            .unwrap_or_else(|| Path::new(""))
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => {
                write!(f, "{}: {} -> {}", self.op, from.display(), to.display())
            }
            (Some(path), None) | (None, Some(path)) => write!(f, "{}: {}", self.op, path.display()),
            (None, None) => write!(f, "{}", self.op),
        }
    }
}

/// Operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CreateDirectory,
    Rename,
    Move,
    Delete,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::CreateDirectory => write!(f, "create_directory"),
            OperationType::Rename => write!(f, "rename"),
            OperationType::Move => write!(f, "move"),
            OperationType::Delete => write!(f, "delete"),
        }
    }
}

/// A media item that was left out of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIssue {
    pub kind: IssueKind,
    /// Video (or subtitle) the issue is about.
    pub path: PathBuf,
    pub message: String,
}

/// Why an item was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Ambiguity,
    Collision,
}

/// Terminal outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OperationOutcome {
    Applied,
    Simulated,
    Failed { cause: String },
    Skipped { reason: String },
}

/// Operation paired with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    pub outcome: OperationOutcome,
}

/// Aggregate execution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Files renamed in place.
    pub renamed: usize,
    /// Files moved to another directory.
    pub moved: usize,
    /// Files deleted.
    pub deleted: usize,
    /// Empty directories removed.
    pub cleaned: usize,
    /// Directories created.
    pub created: usize,
    /// Operations that failed.
    pub failed: usize,
    /// Operations skipped.
    pub skipped: usize,
    /// Operations simulated in dry-run mode.
    pub simulated: usize,
}

impl ExecutionStats {
    /// Count one applied operation. `directory` marks a directory delete.
    pub fn record_applied(&mut self, op: OperationType, directory: bool) {
        match op {
            OperationType::CreateDirectory => self.created += 1,
            OperationType::Rename => self.renamed += 1,
            OperationType::Move => self.moved += 1,
            OperationType::Delete if directory => self.cleaned += 1,
            OperationType::Delete => self.deleted += 1,
        }
    }

    /// Add another set of counters to this one.
    pub fn merge(&mut self, other: &ExecutionStats) {
        self.renamed += other.renamed;
        self.moved += other.moved;
        self.deleted += other.deleted;
        self.cleaned += other.cleaned;
        self.created += other.created;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.simulated += other.simulated;
    }

    /// Number of terminal outcomes recorded.
    pub fn total(&self) -> usize {
        self.renamed
            + self.moved
            + self.deleted
            + self.cleaned
            + self.created
            + self.failed
            + self.skipped
            + self.simulated
    }
}

impl std::fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "renamed {}, moved {}, deleted {}, cleaned {}, created {}, failed {}, skipped {}, simulated {}",
            self.renamed,
            self.moved,
            self.deleted,
            self.cleaned,
            self.created,
            self.failed,
            self.skipped,
            self.simulated
        )
    }
}

/// Per-operation results plus aggregate counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub results: Vec<OperationResult>,
    pub stats: ExecutionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_picks_rename_or_move() {
        let rename = Operation::relocate(
            PathBuf::from("/lib/a/x.mkv"),
            PathBuf::from("/lib/a/y.mkv"),
            "test",
        );
        assert_eq!(rename.op, OperationType::Rename);

        let mv = Operation::relocate(
            PathBuf::from("/lib/x.mkv"),
            PathBuf::from("/lib/X (1999)/X (1999).mkv"),
            "test",
        );
        assert_eq!(mv.op, OperationType::Move);
    }

    #[test]
    fn test_stats_merge_and_total() {
        let mut a = ExecutionStats::default();
        a.record_applied(OperationType::Move, false);
        a.record_applied(OperationType::Delete, true);
        let mut b = ExecutionStats::default();
        b.record_applied(OperationType::Delete, false);
        b.failed += 1;

        a.merge(&b);
        assert_eq!(a.moved, 1);
        assert_eq!(a.cleaned, 1);
        assert_eq!(a.deleted, 1);
        assert_eq!(a.failed, 1);
        assert_eq!(a.total(), 4);
    }

    #[test]
    fn test_operation_type_serializes_snake_case() {
        let json = serde_json::to_string(&OperationType::CreateDirectory).unwrap();
        assert_eq!(json, "\"create_directory\"");
    }
}
