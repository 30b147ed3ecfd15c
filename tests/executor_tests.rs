//! Integration tests for the executor.
//!
//! Tests cover:
//! - Dry-run mode
//! - Per-operation failure isolation
//! - Outcome ordering and stats

use library_fixer::core::executor::{execute_operations, Executor, ExecutorConfig};
use library_fixer::models::plan::{Operation, OperationOutcome};
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[test]
fn test_dry_run_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let video = root.join("Movie.2010.mkv");
    let foreign = root.join("Movie.2010.spa.srt");
    fs::write(&video, "video").unwrap();
    fs::write(&foreign, "subtitle").unwrap();

    let folder = root.join("Movie (2010)");
    let ops = vec![
        Operation::create_directory(folder.clone(), "Destination folder"),
        Operation::relocate(video.clone(), folder.join("Movie (2010).mkv"), "Organize"),
        Operation::delete(foreign.clone(), "Remove foreign subtitle (spa)"),
    ];

    let report = execute_operations(&ops, true);

    assert_eq!(report.stats.simulated, ops.len());
    assert_eq!(report.stats.total(), ops.len());
    assert!(report
        .results
        .iter()
        .all(|r| r.outcome == OperationOutcome::Simulated));
    assert!(video.exists());
    assert!(foreign.exists());
    assert!(!folder.exists());
}

#[test]
fn test_apply_counts_each_operation_type() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let release = root.join("Movie.2010.1080p");
    fs::create_dir(&release).unwrap();
    let video = release.join("Movie.2010.1080p.mkv");
    let sub = release.join("Movie.2010.1080p.por.srt");
    let foreign = release.join("Movie.2010.1080p.spa.srt");
    fs::write(&video, "video").unwrap();
    fs::write(&sub, "subtitle").unwrap();
    fs::write(&foreign, "subtitle").unwrap();

    let folder = root.join("Movie (2010)");
    let ops = vec![
        Operation::create_directory(folder.clone(), "Destination folder"),
        Operation::relocate(video.clone(), folder.join("Movie (2010).mkv"), "Organize"),
        Operation::relocate(sub.clone(), folder.join("Movie (2010).por.srt"), "Subtitle"),
        Operation::delete(foreign.clone(), "Remove foreign subtitle (spa)"),
        Operation::delete(release.clone(), "Directory left empty"),
    ];

    let report = execute_operations(&ops, false);

    assert_eq!(report.stats.created, 1);
    assert_eq!(report.stats.moved, 2);
    assert_eq!(report.stats.deleted, 1);
    assert_eq!(report.stats.cleaned, 1);
    assert_eq!(report.stats.failed, 0);
    assert!(folder.join("Movie (2010).mkv").exists());
    assert!(folder.join("Movie (2010).por.srt").exists());
    assert!(!release.exists());
}

#[test]
fn test_failure_does_not_stop_execution() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let present = root.join("present.mkv");
    fs::write(&present, "video").unwrap();

    let ops = vec![
        Operation::relocate(root.join("missing.mkv"), root.join("Missing.mkv"), "Organize"),
        Operation::relocate(present.clone(), root.join("Present.mkv"), "Organize"),
    ];

    let report = execute_operations(&ops, false);

    assert_eq!(report.results.len(), 2);
    assert!(matches!(
        report.results[0].outcome,
        OperationOutcome::Failed { .. }
    ));
    assert_eq!(report.results[1].outcome, OperationOutcome::Applied);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.renamed, 1);
    assert!(root.join("Present.mkv").exists());
}

#[test]
fn test_results_follow_operation_order() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let names = ["a.srt", "b.srt", "c.srt"];
    let ops: Vec<Operation> = names
        .iter()
        .map(|name| {
            let path = root.join(name);
            fs::write(&path, "subtitle").unwrap();
            Operation::delete(path, "Subtitle lost deduplication")
        })
        .collect();

    let report = execute_operations(&ops, false);

    let order: Vec<_> = report
        .results
        .iter()
        .map(|r| r.operation.from.clone().unwrap())
        .collect();
    let expected: Vec<_> = names.iter().map(|n| root.join(n)).collect();
    assert_eq!(order, expected);
    assert_eq!(report.stats.deleted, 3);
}

#[test]
fn test_occupied_destination_is_not_overwritten() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let from = root.join("new.mkv");
    let to = root.join("existing.mkv");
    fs::write(&from, "new").unwrap();
    fs::write(&to, "existing").unwrap();

    let op = Operation::relocate(from.clone(), to.clone(), "Organize");
    let report = execute_operations(&[op], false);

    assert_eq!(report.stats.failed, 1);
    assert_eq!(fs::read_to_string(&to).unwrap(), "existing");
    assert!(from.exists());
}

#[test]
fn test_move_creates_missing_parent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let from = root.join("episode.mkv");
    let to = root.join("Show").join("Season 01").join("Show - S01E01.mkv");
    fs::write(&from, "video").unwrap();

    let report = execute_operations(&[Operation::relocate(from, to.clone(), "Organize")], false);

    assert_eq!(report.stats.moved, 1);
    assert!(to.exists());
}

#[test]
fn test_cancellation_skips_remaining_operations() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("a.mkv");
    fs::write(&file, "video").unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let executor = Executor::with_config(ExecutorConfig {
        verify_checksum: false,
    });
    let report = executor.execute(
        &[
            Operation::create_directory(temp_dir.path().join("New"), "Destination folder"),
            Operation::delete(file.clone(), "test"),
        ],
        false,
        &cancel,
    );

    assert_eq!(report.stats.skipped, 2);
    assert!(report
        .results
        .iter()
        .all(|r| matches!(r.outcome, OperationOutcome::Skipped { .. })));
    assert!(file.exists());
    assert!(!temp_dir.path().join("New").exists());
}
