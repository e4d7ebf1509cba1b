//! Ordered collection of units belonging to one update.

use std::path::Path;

use super::locator::SourceLocator;
use super::unit::{TransferStatus, TransferUnit};
use crate::error::{UpdateError, UpdateResult};

/// The units of one update operation, unique by final path.
#[derive(Debug, Clone, Default)]
pub struct TransferSet {
    units: Vec<TransferUnit>,
}

impl TransferSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set of one unit per name, each resolved against `root`.
    ///
    /// Names must be plain file names. Staging and final paths are flat, so a
    /// name with a directory component is rejected.
    pub fn from_names<S: AsRef<str>>(
        root: &SourceLocator,
        names: &[S],
        staging_dir: &Path,
        final_dir: &Path,
    ) -> UpdateResult<Self> {
        let mut set = Self::new();
        for name in names {
            let name = name.as_ref();
            if !is_plain_file_name(name) {
                return Err(UpdateError::InvalidLocator(format!(
                    "'{}' is not a plain file name",
                    name
                )));
            }
            let source = root.join(name)?;
            set.add(TransferUnit::new(source, staging_dir, final_dir)?)?;
        }
        Ok(set)
    }

    /// Build a set holding exactly one unit for `source`.
    pub fn single(
        source: SourceLocator,
        staging_dir: &Path,
        final_dir: &Path,
    ) -> UpdateResult<Self> {
        let mut set = Self::new();
        set.add(TransferUnit::new(source, staging_dir, final_dir)?)?;
        Ok(set)
    }

    /// Append a unit, rejecting a second unit with the same final path.
    pub fn add(&mut self, unit: TransferUnit) -> UpdateResult<()> {
        if self.units.iter().any(|u| u.final_path() == unit.final_path()) {
            return Err(UpdateError::DuplicateDestination {
                path: unit.final_path().to_path_buf(),
            });
        }
        self.units.push(unit);
        Ok(())
    }

    /// All units in insertion order.
    pub fn all(&self) -> &[TransferUnit] {
        &self.units
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut TransferUnit> {
        self.units.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether every unit reached `Promoted`.
    pub fn all_promoted(&self) -> bool {
        self.units
            .iter()
            .all(|u| u.status() == TransferStatus::Promoted)
    }

    /// Whether any unit failed.
    pub fn any_failed(&self) -> bool {
        self.units
            .iter()
            .any(|u| u.status() == TransferStatus::Failed)
    }

    /// Number of units that reached `Promoted`.
    pub fn promoted_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status() == TransferStatus::Promoted)
            .count()
    }

    /// File names of all units, sent to the copy bridge as literal names.
    pub fn file_names(&self) -> Vec<String> {
        self.units.iter().map(TransferUnit::file_name).collect()
    }

    /// Mark every non-terminal unit failed.
    pub(crate) fn fail_remaining(&mut self) {
        for unit in &mut self.units {
            unit.fail();
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
