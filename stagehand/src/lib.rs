//! Stagehand - staged content updates with atomic promotion
//!
//! Stagehand brings a live directory up to date from a remote source. Files
//! are first transferred into a staging directory, over HTTP(S) or by a
//! local mirroring tool, and only renamed into the live directory once each
//! staged copy is complete. A package update additionally unpacks zip and
//! tar archives in place.
//!
//! # Example
//!
//! ```no_run
//! use stagehand::{EngineConfig, PackageUpdateEngine, UpdateEngine};
//!
//! # async fn run() -> Result<(), stagehand::UpdateError> {
//! let config = EngineConfig::new("https://builds.example.com/app.zip", "/srv/app")
//!     .with_staging_dir("/srv/app.tmp");
//! let engine = PackageUpdateEngine::new(config)?;
//! let report = engine.update().await?;
//! println!("promoted {} file(s)", report.promoted_count());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod copy;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod transfer;

pub use config::{ConfigFile, EngineConfig};
pub use engine::{
    ContentUpdateEngine, LogListener, PackageUpdateEngine, TransferListener, UpdateEngine,
    UpdateReport,
};
pub use error::{UpdateError, UpdateResult};
pub use transfer::{SourceLocator, TransferMode, TransferSet, TransferStatus, TransferUnit};
