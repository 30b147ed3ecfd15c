//! Library Fixer CLI
//!
//! A command-line tool for reorganizing movie and TV libraries.

use clap::Parser;
use library_fixer::cli::{
    args::{Cli, Commands},
    commands::{batch, execute, plan, scan},
};
use library_fixer::core::batch::BatchOptions;
use library_fixer::models::config::{load_config, load_config_from};
use library_fixer::services::resolver::ConfiguredResolver;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    config.validate()?;
    let resolver = Arc::new(ConfiguredResolver::from_config(&config, cli.offline));
    if resolver.is_offline() {
        tracing::debug!("Metadata lookups disabled");
    }

    // Run the appropriate command
    match cli.command {
        Commands::Scan { path } => {
            scan::scan(&path, &config)?;
        }

        Commands::Plan { path, output } => {
            plan::plan(&path, output.as_deref(), &config, resolver.as_ref()).await?;
        }

        Commands::Execute { plan_file, apply } => {
            execute::execute_plan(&plan_file, apply)?;
        }

        Commands::Run {
            path,
            apply,
            report,
        } => {
            execute::run(&path, apply, report.as_deref(), &config, resolver.as_ref()).await?;
        }

        Commands::Batch {
            paths,
            jobs,
            apply,
            log_dir,
            report,
        } => {
            let mut options = BatchOptions::from_config(&config);
            options.dry_run = !apply;
            options.show_progress = true;
            if let Some(jobs) = jobs {
                options.concurrency = jobs.max(1);
            }
            if log_dir.is_some() {
                options.log_dir = log_dir;
            }
            batch::batch(
                &paths,
                options,
                report.as_deref(),
                Arc::new(config),
                Arc::clone(&resolver),
            )
            .await?;
        }
    }

    if let Err(e) = resolver.persist() {
        tracing::warn!("Failed to save metadata cache: {}", e);
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("library_fixer=debug")
    } else {
        EnvFilter::new("library_fixer=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
