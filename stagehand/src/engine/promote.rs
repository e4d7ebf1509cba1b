//! Moving staged files into their live location.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{UpdateError, UpdateResult};
use crate::transfer::{TransferSet, TransferStatus};

#[cfg(unix)]
const EXDEV: i32 = 18;
#[cfg(windows)]
const EXDEV: i32 = 17; // ERROR_NOT_SAME_DEVICE

fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(any(unix, windows))]
    {
        e.raw_os_error() == Some(EXDEV)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = e;
        false
    }
}

/// Create a directory and its parents.
pub(crate) async fn ensure_dir(path: &Path) -> UpdateResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| UpdateError::DirectoryCreation {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Move `staging` to `final_path`.
///
/// A plain rename is atomic on one filesystem. Across filesystems the file is
/// first copied next to `final_path` and then renamed over it, so the live
/// path never holds a partially written file.
pub(crate) async fn promote(staging: &Path, final_path: &Path) -> UpdateResult<()> {
    match fs::rename(staging, final_path).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                from = %staging.display(),
                to = %final_path.display(),
                "Staging and final directories are on different filesystems"
            );
            copy_then_rename(staging, final_path).await
        }
        Err(e) => Err(UpdateError::PromotionFailed {
            from: staging.to_path_buf(),
            to: final_path.to_path_buf(),
            source: e,
        }),
    }
}

fn sibling_temp_path(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    final_path.with_file_name(format!(".{}.promoting", name))
}

async fn copy_then_rename(staging: &Path, final_path: &Path) -> UpdateResult<()> {
    let temp = sibling_temp_path(final_path);
    let failed = |source: io::Error| UpdateError::PromotionFailed {
        from: staging.to_path_buf(),
        to: final_path.to_path_buf(),
        source,
    };

    let result = async {
        fs::copy(staging, &temp).await?;
        fs::rename(&temp, final_path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp).await;
        return Err(failed(e));
    }

    if let Err(e) = fs::remove_file(staging).await {
        warn!(path = %staging.display(), error = %e, "Failed to remove staged file after copy");
    }
    Ok(())
}

/// Remove staged files for every unit that was not promoted.
pub(crate) async fn discard_staged(set: &TransferSet) {
    for unit in set.all() {
        if unit.status() == TransferStatus::Promoted {
            continue;
        }
        match fs::remove_file(unit.staging_path()).await {
            Ok(()) => debug!(path = %unit.staging_path().display(), "Discarded staged file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %unit.staging_path().display(),
                error = %e,
                "Failed to discard staged file"
            ),
        }
    }
}
