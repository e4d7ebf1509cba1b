//! Transfer units, sets, and aggregate completion tracking.
//!
//! These are plain value types. All I/O lives in the engine, which owns a
//! [`TransferSet`] for the duration of one update and drives each
//! [`TransferUnit`] through its lifecycle:
//!
//! ```text
//! Pending -> InFlight -> Staged -> Promoted
//!     \          \          \
//!      +----------+----------+--> Failed
//! ```

mod locator;
mod set;
mod tracker;
mod unit;

pub use locator::{SourceLocator, TransferMode};
pub use set::TransferSet;
pub use tracker::{CompletionTracker, Progress};
pub use unit::{TransferStatus, TransferUnit};
