//! find-idle-instances
//!
//! Identifies idle or stuck EC2 workers from their CloudWatch CPU history
//! and optionally terminates or reboots them after confirmation.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use commands::{find, remediate, SweepArgs, SweepRequest, ValidationError};
use idle_lib::{RemediationAction, SweepMetrics};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// find-idle-instances - fixing your idle AWS servers
#[derive(Parser)]
#[command(name = "find-idle-instances")]
#[command(
    author,
    version,
    about = "Identifies and optionally terminates idle workers",
    long_about = "Identifies and optionally terminates idle workers. Idle is defined as \
                  less than 1% CPU, or CPU flatlined above 5%, over the last 3 hours."
)]
pub struct Cli {
    /// Settings file (defaults to ~/.config/find-idle-instances/config.toml)
    #[arg(long, global = true, env = "FIND_IDLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Finds stuck instances
    Find(SweepArgs),

    /// Terminates stuck instances
    Terminate {
        #[command(flatten)]
        sweep: SweepArgs,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Reboot stuck instances
    Reboot {
        #[command(flatten)]
        sweep: SweepArgs,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Find(_) => "find",
            Commands::Terminate { .. } => "terminate",
            Commands::Reboot { .. } => "reboot",
        }
    }

    fn sweep(&self) -> &SweepArgs {
        match self {
            Commands::Find(sweep)
            | Commands::Terminate { sweep, .. }
            | Commands::Reboot { sweep, .. } => sweep,
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Print the validation message and the subcommand's help
fn report_validation_error(subcommand: &str, err: &ValidationError) {
    output::print_error(&err.to_string());
    let mut cli = Cli::command();
    if let Some(sub) = cli.find_subcommand_mut(subcommand) {
        let _ = sub.print_help();
    }
}

fn write_metrics_file(request: &SweepRequest) -> Result<()> {
    if let Some(path) = &request.metrics_file {
        let text = SweepMetrics::new().export_text()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }
    Ok(())
}

async fn execute(command: Commands, config_path: Option<PathBuf>) -> Result<ExitCode> {
    if let Err(err) = command.sweep().validate() {
        report_validation_error(command.name(), &err);
        return Ok(ExitCode::from(1));
    }

    let settings = config::Settings::load(config_path.as_deref())?;
    debug!(?settings, command = command.name(), "Loaded settings");
    let request = command.sweep().resolve(&settings)?;

    let code = match command {
        Commands::Find(_) => {
            find::find(&request).await?;
            ExitCode::SUCCESS
        }
        Commands::Terminate { yes, .. } => {
            remediate::remediate(&request, RemediationAction::Terminate, yes).await?
        }
        Commands::Reboot { yes, .. } => {
            remediate::remediate(&request, RemediationAction::Reboot, yes).await?
        }
    };

    write_metrics_file(&request)?;
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };

    match execute(command, cli.config).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(1)
        }
    }
}
