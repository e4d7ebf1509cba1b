//! Arguments and helpers shared by the update commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use stagehand::config::{ConfigFile, CopyTool, CopyToolConfig};
use stagehand::{EngineConfig, TransferListener, TransferUnit, UpdateReport};

use crate::error::CliError;

/// Copy tool selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CopyToolArg {
    /// Windows robocopy
    Robocopy,
    /// rsync
    Rsync,
    /// Built-in mirror, no external program
    Native,
}

impl From<CopyToolArg> for CopyTool {
    fn from(arg: CopyToolArg) -> Self {
        match arg {
            CopyToolArg::Robocopy => CopyTool::Robocopy,
            CopyToolArg::Rsync => CopyTool::Rsync,
            CopyToolArg::Native => CopyTool::Native,
        }
    }
}

/// Overrides for the `[updater]`, `[network]` and `[copy]` settings.
#[derive(Debug, Clone, Default, Args)]
pub struct EngineArgs {
    /// Remote source: an http(s) URL or a local path
    #[arg(long)]
    pub remote: Option<String>,

    /// Live directory that receives the update
    #[arg(long)]
    pub local: Option<PathBuf>,

    /// Staging directory for in-flight files
    #[arg(long)]
    pub temp: Option<PathBuf>,

    /// Network timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum concurrent downloads
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Copy tool for local sources
    #[arg(long, value_enum)]
    pub copy_tool: Option<CopyToolArg>,
}

/// Merge CLI overrides over the configuration file.
pub fn resolve_engine_config(
    args: &EngineArgs,
    config: &ConfigFile,
) -> Result<EngineConfig, CliError> {
    let remote = args
        .remote
        .clone()
        .or_else(|| config.updater.remote.clone())
        .filter(|r| !r.trim().is_empty())
        .ok_or(CliError::MissingRemote)?;

    let mut engine = config.to_engine_config(Some(remote));
    if let Some(local) = &args.local {
        engine.final_dir = local.clone();
    }
    if let Some(temp) = &args.temp {
        engine.staging_dir = temp.clone();
    }
    if let Some(timeout) = args.timeout {
        engine = engine.with_timeout((timeout > 0).then(|| Duration::from_secs(timeout)));
    }
    if let Some(parallel) = args.parallel {
        engine = engine.with_max_concurrent_transfers(parallel);
    }
    if let Some(tool) = args.copy_tool {
        engine = engine.with_copy_tool(CopyToolConfig {
            tool: tool.into(),
            program: None,
        });
    }
    Ok(engine)
}

/// Spinner shown while an update runs.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.green} {msg} {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints each promoted file above the spinner.
pub struct SpinnerListener {
    pb: ProgressBar,
}

impl SpinnerListener {
    pub fn new(pb: ProgressBar) -> Arc<Self> {
        Arc::new(Self { pb })
    }
}

impl TransferListener for SpinnerListener {
    fn loaded(&self, unit: &TransferUnit) {
        self.pb.println(format!(
            "  {} {}",
            console::style("✔").green(),
            unit.file_name()
        ));
        tracing::debug!(path = %unit.final_path().display(), "Promoted");
    }
}

/// Print the final summary of an update.
pub fn print_report(report: &UpdateReport) {
    if report.is_no_change() {
        println!("{}", console::style("Already up to date").green());
        return;
    }

    println!(
        "{} {} file(s) promoted",
        console::style("Done:").green().bold(),
        report.promoted_count()
    );
    if let Some(files) = report.extracted_files {
        println!("  Extracted {} file(s)", files);
        if report.archive_removed {
            println!("  Archive removed");
        }
    }
    if let Some(e) = &report.extraction_error {
        println!(
            "{} {}",
            console::style("Extraction failed:").yellow().bold(),
            e
        );
        println!("  The package archive was left in place.");
    }
}
