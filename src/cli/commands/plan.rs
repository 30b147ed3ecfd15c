//! Plan command implementation.

use crate::core::planner::{self, Planner};
use crate::models::config::Config;
use crate::models::plan::{IssueKind, OperationType, Plan};
use crate::services::resolver::MetadataResolver;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Print a plan summary and its issues.
pub fn print_plan(plan: &Plan) {
    println!("{}", "[Plan Summary]".bold().green());
    println!(
        "  {} {}",
        "Directories to create:".bold(),
        plan.count(OperationType::CreateDirectory)
    );
    println!("  {} {}", "Renames:".bold(), plan.count(OperationType::Rename));
    println!("  {} {}", "Moves:".bold(), plan.count(OperationType::Move));
    println!("  {} {}", "Deletes:".bold(), plan.count(OperationType::Delete));
    println!();

    for op in &plan.operations {
        let line = op.to_string();
        match op.op {
            OperationType::Delete => println!("  {}", line.red()),
            OperationType::CreateDirectory => println!("  {}", line.dimmed()),
            _ => println!("  {}", line),
        }
    }

    if !plan.issues.is_empty() {
        println!();
        println!("{}", "[Skipped Items]".bold().yellow());
        for issue in &plan.issues {
            let kind = match issue.kind {
                IssueKind::Ambiguity => "ambiguous",
                IssueKind::Collision => "collision",
            };
            println!("  {} {}", format!("[{}]", kind).yellow(), issue.message);
        }
    }
}

/// Execute the plan command.
pub async fn plan<R: MetadataResolver>(
    path: &Path,
    output: Option<&Path>,
    config: &Config,
    resolver: &R,
) -> Result<()> {
    println!("{}", "[PLAN] Planning library...".bold().cyan());
    println!("  {} {}", "Folder:".bold(), path.display());
    println!();

    let plan = Planner::new(config, resolver).plan(path).await?;
    print_plan(&plan);

    let output_path = match output {
        Some(o) => o.to_path_buf(),
        None => planner::default_plan_path(path),
    };
    planner::save_plan(&plan, &output_path)?;

    println!();
    println!(
        "{} {}",
        "[OK] Plan saved to:".bold().green(),
        output_path.display()
    );
    println!(
        "  To apply it: {}",
        format!("library-fixer execute {} --apply", output_path.display()).cyan()
    );

    Ok(())
}
