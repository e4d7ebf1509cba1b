//! Stagehand CLI - Command-line interface
//!
//! Runs package and content updates using the stagehand library.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stagehand::config::{ConfigError, ConfigFile};
use stagehand::logging::{init_logging, LoggingConfig};

use commands::content::ContentArgs;
use commands::package::PackageArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(version, about = "Staged content and package updates", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/stagehand/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download or copy a package file, then extract it if it is an archive
    Package(PackageArgs),
    /// Download or copy a list of named files
    Content(ContentArgs),
}

fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => match ConfigFile::load() {
            Err(ConfigError::NoConfigDir) => Ok(ConfigFile::default()),
            result => Ok(result?),
        },
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_ref())?;

    let mut logging = LoggingConfig::from(&config.logging);
    if cli.verbose {
        logging = logging.with_filter("debug").with_target(true);
    }
    let _guard = init_logging(&logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let command = cli.command;
    runtime.block_on(async move {
        match command {
            Commands::Package(args) => commands::package::run(args, &config).await,
            Commands::Content(args) => commands::content::run(args, &config).await,
        }
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
