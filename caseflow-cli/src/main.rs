//! Caseflow runner binary.
//!
//! Resolves registered test files from the CLI paths, runs them on a
//! current-thread runtime (execution is strictly sequential), and renders
//! the report to the console and the run's log directory.

mod args;
mod demo;

use anyhow::Context;
use args::RunnerArgs;
use caseflow::prelude::*;
use clap::{CommandFactory, FromArgMatches};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let (registry, framework) = demo::register()?;

    let after_help = args::render_flag_help(&registry, &framework);
    let mut command = RunnerArgs::command();
    if !after_help.is_empty() {
        command = command.after_help(after_help);
    }
    let cli = RunnerArgs::from_arg_matches(&command.get_matches())?;

    if cli.list {
        print_case_list(&registry);
        return Ok(());
    }
    if cli.paths.is_empty() {
        println!("No test case files provided; nothing to run.");
        return Ok(());
    }

    let shared = args::parse_arg_pairs(&cli.args)?;
    let framework_args = shared.scoped(framework.arg_specs.iter().map(|s| s.name.as_str()));
    let framework = framework.with_args(Arc::new(framework_args));

    let mut files = registry.resolve(&cli.paths)?;
    for file in &mut files {
        let scoped = shared.scoped(file.arg_specs().iter().map(|s| s.name.as_str()));
        file.set_args(Arc::new(scoped));
    }

    let log_dir = match cli.log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    let report = SuiteRunner::new()
        .with_framework(framework)
        .run(&files, &log_dir)
        .await?;

    report.write_json()?;
    report.write_summary()?;

    println!("\nExecution Summary");
    println!("-----------------");
    print!("{}", report.render_summary());
    println!("\nLogs {}", report.log_dir.display());

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Prints the indexed table of discoverable test cases.
fn print_case_list(registry: &FileRegistry) {
    let mut rows = Vec::new();
    let mut idx = 1;
    for file in registry.files() {
        for case in file.cases() {
            rows.push(vec![
                idx.to_string(),
                file.path().display().to_string(),
                case.name().to_string(),
                case.description().unwrap_or("").to_string(),
            ]);
            idx += 1;
        }
    }
    print!(
        "{}",
        caseflow::report::render_table(&["Id", "File", "TestCase", "Description"], &rows)
    );
}

/// Creates `logs/<timestamp>` and refreshes the `latest` link.
fn default_log_dir() -> anyhow::Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S").to_string();
    let root = PathBuf::from("logs");
    let dir = root.join(&timestamp);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    refresh_latest_link(&root, &timestamp);
    Ok(dir)
}

#[cfg(unix)]
fn refresh_latest_link(root: &Path, timestamp: &str) {
    let link = root.join("latest");
    let _ = std::fs::remove_file(&link);
    if let Err(err) = std::os::unix::fs::symlink(timestamp, &link) {
        tracing::debug!(error = %err, "could not refresh logs/latest link");
    }
}

#[cfg(not(unix))]
fn refresh_latest_link(_root: &Path, _timestamp: &str) {}
