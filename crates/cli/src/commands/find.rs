//! `find` subcommand

use super::{build_run, SweepRequest};
use crate::output::{print_results, ConsoleProgress, OutputFormat};
use anyhow::{Context, Result};
use colored::Colorize;
use idle_lib::{ClassificationRun, ResultSet};
use std::sync::Arc;

/// Announce the run in table mode
pub fn print_running(request: &SweepRequest) {
    if request.format == OutputFormat::Table {
        println!("{}", format!("Running ({})...", request.filter.name_tag).green());
    }
}

/// Classify the fleet with a live progress counter
pub async fn classify_fleet(run: &ClassificationRun, request: &SweepRequest) -> Result<ResultSet> {
    let progress = match request.format {
        OutputFormat::Table => Arc::new(ConsoleProgress::announcing()),
        OutputFormat::Json => Arc::new(ConsoleProgress::new()),
    };
    run.execute(&request.filter, progress)
        .await
        .with_context(|| format!("Classification run for '{}' failed", request.filter.name_tag))
}

/// Find and display idle instances
pub async fn find(request: &SweepRequest) -> Result<ResultSet> {
    print_running(request);

    let (run, _) = build_run(request).await;
    let results = classify_fleet(&run, request).await?;
    print_results(
        &results,
        request.show_good,
        request.show_unknown,
        request.format,
    )?;

    Ok(results)
}
