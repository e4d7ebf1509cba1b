//! Single-caller enforcement for engine instances.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{UpdateError, UpdateResult};

/// Rejects a second update while one is running on the same engine.
#[derive(Debug, Default)]
pub(crate) struct UpdateGuard {
    running: AtomicBool,
}

/// Held for the duration of one update; releases the guard on drop.
#[derive(Debug)]
pub(crate) struct UpdateToken<'a> {
    guard: &'a UpdateGuard,
}

impl UpdateGuard {
    pub(crate) fn acquire(&self) -> UpdateResult<UpdateToken<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| UpdateError::UpdateInProgress)?;
        Ok(UpdateToken { guard: self })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for UpdateToken<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}
