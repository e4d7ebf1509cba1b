//! `stagehand package`: update from a single package file.

use clap::Args;
use stagehand::config::ConfigFile;
use stagehand::{PackageUpdateEngine, UpdateEngine};

use super::common::{print_report, resolve_engine_config, spinner, EngineArgs, SpinnerListener};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct PackageArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Keep the archive in the live directory after extraction
    #[arg(long)]
    pub keep_archive: bool,

    /// Expected SHA-256 digest of the package
    #[arg(long, value_name = "DIGEST")]
    pub sha256: Option<String>,
}

/// Run a package update.
pub async fn run(args: PackageArgs, config: &ConfigFile) -> Result<(), CliError> {
    let mut engine_config = resolve_engine_config(&args.engine, config)?;
    if args.keep_archive {
        engine_config = engine_config.with_keep_archive(true);
    }

    println!("Package: {}", engine_config.remote);
    println!("Target:  {}", engine_config.final_dir.display());

    let pb = spinner("Updating package");
    let mut engine =
        PackageUpdateEngine::new(engine_config)?.with_listener(SpinnerListener::new(pb.clone()));
    if let Some(digest) = args.sha256 {
        engine = engine.with_expected_sha256(digest);
    }

    let result = engine.update().await;
    pb.finish_and_clear();

    let report = result?;
    print_report(&report);
    Ok(())
}
