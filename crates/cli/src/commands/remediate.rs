//! `terminate` and `reboot` subcommands

use super::find::{classify_fleet, print_running};
use super::{build_run, SweepRequest};
use crate::output::{
    print_remediation_banner, print_remediation_report, print_results, ConsoleProgress,
    OutputFormat,
};
use anyhow::{Context, Result};
use idle_lib::{InstanceRef, RemediationAction, RemediationExecutor};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

/// Ask for a `y`/`n` answer; anything other than `y` declines
pub fn confirm<R: BufRead, W: Write>(
    action: RemediationAction,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    let verb = match action {
        RemediationAction::Terminate => "Terminate",
        RemediationAction::Reboot => "Reboot",
    };
    writeln!(output)?;
    write!(output, "{} Instances? (y/n)  ", verb)?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Classify the fleet, confirm, then remediate the bad instances
pub async fn remediate(
    request: &SweepRequest,
    action: RemediationAction,
    assume_yes: bool,
) -> Result<ExitCode> {
    print_running(request);

    let (run, fleet) = build_run(request).await;
    let results = classify_fleet(&run, request).await?;
    print_results(
        &results,
        request.show_good,
        request.show_unknown,
        request.format,
    )?;

    if results.bad.is_empty() {
        if request.format == OutputFormat::Table {
            println!("No bad instances present.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !assume_yes {
        let stdin = io::stdin();
        let confirmed = confirm(action, &mut stdin.lock(), &mut io::stdout())
            .context("Failed to read confirmation")?;
        if !confirmed {
            return Ok(ExitCode::SUCCESS);
        }
    }

    print_remediation_banner(action, &results.bad);

    let targets: Vec<InstanceRef> = results.bad.iter().map(|r| r.instance.clone()).collect();
    let executor = RemediationExecutor::new(fleet, request.filter.name_tag.clone());
    let report = executor
        .remediate(&targets, action, &ConsoleProgress::new())
        .await;
    print_remediation_report(&report);

    if report.failed() > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
