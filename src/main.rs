//! dirdiff - Catalog, Diff, and Repair for Large File Trees
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dirdiff::analyze::analyze;
use dirdiff::builder::build;
use dirdiff::config::{validate_batch_size, CliArgs, Command, Config};
use dirdiff::diff::diff;
use dirdiff::progress::{print_scan_summary, ProgressReporter};
use dirdiff::repair::repair;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = Config::load(&args.config)
        .with_context(|| format!("Invalid configuration '{}'", args.config.display()))?;

    match args.command {
        Command::Scan { batch_size } => {
            let batch_size = validate_batch_size(batch_size).context("Invalid batch size")?;

            let progress = if args.quiet {
                None
            } else {
                Some(ProgressReporter::new())
            };

            let stats = build(&config, batch_size, progress.as_ref()).context("Scan failed")?;

            if let Some(ref p) = progress {
                p.finish_and_clear();
                print_scan_summary(&stats, &config.store_path.display().to_string());
            }
        }

        Command::Diff { source, report } => {
            let stats = diff(&config, &source, &report).context("Diff failed")?;
            println!(
                "{} missing, {} checksum wrong -> {}",
                stats.missing,
                stats.mismatched,
                report.display()
            );
        }

        Command::Count { report } => {
            let stats = analyze(&config, &report).context("Analysis failed")?;
            println!("total count is: {}", stats.count);
        }

        Command::Size { report } => {
            let stats = analyze(&config, &report).context("Analysis failed")?;
            println!("total size is: {}GB", stats.total_gb());
        }

        Command::Repair {
            report,
            template,
            resume,
            queue,
        } => {
            let stats =
                repair(&config, &report, &queue, &template, resume).context("Repair failed")?;
            if stats.command_failures > 0 {
                info!(
                    failures = stats.command_failures,
                    "Some repair commands failed; rerun diff to find what is still broken"
                );
            }
            println!(
                "repair complete: {} executed, {} failed",
                stats.executed, stats.command_failures
            );
        }
    }

    info!("program finished");
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dirdiff=debug,warn")
    } else {
        EnvFilter::new("dirdiff=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
