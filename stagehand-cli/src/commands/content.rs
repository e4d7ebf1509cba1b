//! `stagehand content`: update a list of named files.

use clap::Args;
use stagehand::config::ConfigFile;
use stagehand::{ContentUpdateEngine, UpdateEngine};

use super::common::{print_report, resolve_engine_config, spinner, EngineArgs, SpinnerListener};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ContentArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// File names to update, relative to the remote directory
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Run a content update.
pub async fn run(args: ContentArgs, config: &ConfigFile) -> Result<(), CliError> {
    let engine_config = resolve_engine_config(&args.engine, config)?;

    println!("Source: {}", engine_config.remote);
    println!("Target: {}", engine_config.final_dir.display());
    println!("Files:  {}", args.names.len());

    let pb = spinner(format!("Updating {} file(s)", args.names.len()));
    let engine = ContentUpdateEngine::new(engine_config, args.names)?
        .with_listener(SpinnerListener::new(pb.clone()));

    let result = engine.update().await;
    pb.finish_and_clear();

    let report = result?;
    print_report(&report);
    Ok(())
}
