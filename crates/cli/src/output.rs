//! Output formatting utilities

use clap::ValueEnum;
use colored::{Color, Colorize};
use idle_lib::{
    Bucket, Classification, ClassificationResult, ProgressReporter, RemediationAction,
    RemediationReport, ResultSet,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a CPU statistic the way the console tables show it
pub fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}

/// Reason column text for a result
pub fn reason_text(result: &ClassificationResult) -> String {
    match &result.classification {
        Classification::Bad { reason, .. } => reason.to_string(),
        Classification::Unknown { cause } => format!("Unknown CPU ({})", cause),
        Classification::Good { .. } => String::new(),
    }
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "CPU%")]
    cpu: String,
}

#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Instance")]
    instance: String,
    #[tabled(rename = "CPU%")]
    cpu: String,
}

fn bucket_color(bucket: Bucket) -> Color {
    match bucket {
        Bucket::Bad => Color::Red,
        Bucket::Good => Color::Green,
        Bucket::Unknown => Color::Cyan,
    }
}

fn bucket_title(bucket: Bucket, count: usize) -> String {
    let name = match bucket {
        Bucket::Bad => "Bad",
        Bucket::Good => "Good",
        Bucket::Unknown => "Unknown",
    };
    format!("{} Instances ({})", name, count)
}

/// Render one bucket as a titled table
pub fn render_bucket(bucket: Bucket, results: &[ClassificationResult]) -> String {
    let title = bucket_title(bucket, results.len())
        .color(bucket_color(bucket))
        .bold()
        .to_string();

    let table = if bucket == Bucket::Good {
        let rows: Vec<ScoreRow> = results
            .iter()
            .map(|r| ScoreRow {
                instance: r.instance.label(),
                cpu: format_score(r.score()),
            })
            .collect();
        Table::new(rows).with(Style::rounded()).to_string()
    } else {
        let rows: Vec<ResultRow> = results
            .iter()
            .map(|r| ResultRow {
                instance: r.instance.label(),
                reason: reason_text(r),
                cpu: format_score(r.score()),
            })
            .collect();
        Table::new(rows).with(Style::rounded()).to_string()
    };

    format!("{}\n{}", title, table)
}

/// Print the classification results
pub fn print_results(
    results: &ResultSet,
    show_good: bool,
    show_unknown: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Table => {
            let has_bad = !results.bad.is_empty();
            if show_good || show_unknown || has_bad {
                println!();
            }
            if show_good {
                println!("{}\n", render_bucket(Bucket::Good, &results.good));
            }
            if show_unknown {
                println!("{}\n", render_bucket(Bucket::Unknown, &results.unknown));
            }
            if has_bad {
                println!("{}\n", render_bucket(Bucket::Bad, &results.bad));
            }
            println!(
                "Bad: {}  Good: {}  Unknown: {}",
                results.bad.len().to_string().red(),
                results.good.len().to_string().green(),
                results.unknown.len().to_string().cyan()
            );
        }
    }
    Ok(())
}

/// Banner and target list shown before a remediation sweep
pub fn print_remediation_banner(action: RemediationAction, targets: &[ClassificationResult]) {
    let banner = match action {
        RemediationAction::Terminate => "Terminating Instances!",
        RemediationAction::Reboot => "Rebooting Instances!",
    };
    println!();
    println!("{}", banner.red().bold());
    println!("{}", "-".repeat(22).red());
    for target in targets {
        println!("{}", target.instance.label());
    }
    println!();
}

/// Tally and per-instance failures after a remediation sweep
pub fn print_remediation_report(report: &RemediationReport) {
    println!("Complete");
    if report.failed() == 0 {
        print_success(&format!(
            "{} succeeded, 0 failed",
            report.succeeded()
        ));
        return;
    }

    print_warning(&format!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    ));
    for failure in report.failures() {
        print_error(&format!(
            "{}: {}",
            failure.instance.id,
            failure.error.as_deref().unwrap_or_default()
        ));
    }
}

/// Live `Processed k/N instances.` counter
pub struct ConsoleProgress {
    bar: ProgressBar,
    high_water: AtomicU64,
    announce_total: bool,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template("Processed {pos}/{len} instances.") {
            bar.set_style(style);
        }
        Self {
            bar,
            high_water: AtomicU64::new(0),
            announce_total: false,
        }
    }

    /// Also print `Found N matching instances.` when the run starts
    pub fn announcing() -> Self {
        Self {
            announce_total: true,
            ..Self::new()
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn on_start(&self, total: usize) {
        if self.announce_total {
            self.bar
                .suspend(|| println!("Found {} matching instances.", total));
        }
        self.high_water.store(0, Ordering::SeqCst);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn on_progress(&self, processed: usize, _total: usize) {
        // Updates from concurrent workers can arrive out of order
        let processed = processed as u64;
        let previous = self.high_water.fetch_max(processed, Ordering::SeqCst);
        if processed > previous {
            self.bar.set_position(processed);
        }
    }

    fn on_finish(&self) {
        self.bar.finish();
    }
}
