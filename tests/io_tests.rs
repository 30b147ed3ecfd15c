//! Integration tests for file I/O operations.
//!
//! Tests cover:
//! - Plan save/load
//! - Execution report save
//! - Configuration loading

use library_fixer::core::executor::{execute_operations, save_report};
use library_fixer::core::planner::{load_plan, save_plan, PLAN_VERSION};
use library_fixer::models::config::load_config_from;
use library_fixer::models::plan::{IssueKind, Operation, OperationType, Plan, PlanIssue};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ========== PLAN I/O TESTS ==========

fn sample_plan() -> Plan {
    let root = PathBuf::from("/library");
    Plan {
        version: PLAN_VERSION.to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        root: root.clone(),
        operations: vec![
            Operation::create_directory(
                root.join("Matrix (1999) [tmdbid-603]"),
                "Destination folder",
            ),
            Operation::relocate(
                root.join("Matrix.1999.1080p.BluRay.mkv"),
                root.join("Matrix (1999) [tmdbid-603]/Matrix (1999).mkv"),
                "Organize Matrix (1999)",
            ),
            Operation::delete(
                root.join("Matrix.1999.1080p.BluRay.spa.srt"),
                "Remove foreign subtitle (spa)",
            ),
        ],
        issues: vec![PlanIssue {
            kind: IssueKind::Collision,
            path: root.join("Other.mkv"),
            message: "Destination collision".to_string(),
        }],
    }
}

#[test]
fn test_save_and_load_plan() {
    let plan = sample_plan();

    let temp_dir = TempDir::new().unwrap();
    let plan_path = temp_dir.path().join("test_plan.json");

    // Save
    save_plan(&plan, &plan_path).unwrap();
    assert!(plan_path.exists());

    // Load
    let loaded = load_plan(&plan_path).unwrap();
    assert_eq!(loaded.version, plan.version);
    assert_eq!(loaded.root, plan.root);
    assert_eq!(loaded.operations, plan.operations);
    assert_eq!(loaded.issues.len(), 1);
    assert_eq!(loaded.issues[0].kind, IssueKind::Collision);
}

#[test]
fn test_plan_json_uses_snake_case_operation_types() {
    let plan = sample_plan();
    let json = serde_json::to_string(&plan).unwrap();

    assert!(json.contains("\"create_directory\""));
    assert!(json.contains("\"move\""));
    assert!(json.contains("\"delete\""));
}

#[test]
fn test_save_plan_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let plan_path = temp_dir.path().join("nested").join("dir").join("plan.json");

    save_plan(&sample_plan(), &plan_path).unwrap();
    assert!(plan_path.exists());
}

#[test]
fn test_load_plan_nonexistent() {
    let result = load_plan(&PathBuf::from("/nonexistent/plan.json"));
    assert!(result.is_err());
}

#[test]
fn test_load_plan_invalid_json() {
    let temp_dir = TempDir::new().unwrap();
    let plan_path = temp_dir.path().join("invalid.json");
    fs::write(&plan_path, "{ not valid json }").unwrap();

    assert!(load_plan(&plan_path).is_err());
}

#[test]
fn test_loaded_plan_counts_operations() {
    let temp_dir = TempDir::new().unwrap();
    let plan_path = temp_dir.path().join("plan.json");
    save_plan(&sample_plan(), &plan_path).unwrap();

    let loaded = load_plan(&plan_path).unwrap();
    assert_eq!(loaded.count(OperationType::CreateDirectory), 1);
    assert_eq!(loaded.count(OperationType::Move), 1);
    assert_eq!(loaded.count(OperationType::Delete), 1);
    assert_eq!(loaded.count(OperationType::Rename), 0);
}

// ========== REPORT I/O TESTS ==========

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let report = execute_operations(&sample_plan().operations, true);
    let report_path = temp_dir.path().join("reports").join("report.json");

    save_report(&report, &report_path).unwrap();

    let content = fs::read_to_string(&report_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["stats"]["simulated"], 3);
    assert_eq!(value["results"][0]["outcome"]["status"], "simulated");
}

// ========== CONFIG TESTS ==========

#[test]
fn test_load_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
kept_languages = ["por", "eng", "spa"]
concurrency = 3
add_quality_tag = true

[tmdb]
language = "en-US"
"#,
    )
    .unwrap();

    let config = load_config_from(&config_path).unwrap();
    assert_eq!(config.kept_languages, vec!["por", "eng", "spa"]);
    assert_eq!(config.concurrency, 3);
    assert!(config.add_quality_tag);
    assert_eq!(config.tmdb.language, "en-US");
    // Unset keys keep their defaults
    assert_eq!(config.home_language, "por");
    assert!(config.dry_run);
}

#[test]
fn test_load_config_missing_file() {
    assert!(load_config_from(&PathBuf::from("/nonexistent/config.toml")).is_err());
}
