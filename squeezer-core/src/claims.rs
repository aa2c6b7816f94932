//! In-process bookkeeping on base names.
//!
//! A claim is held for the whole pipeline run of one file so that two runs for
//! the same base name never transcode or relocate concurrently. The failure
//! ledger remembers names whose transcode failed so catch-up scans leave them
//! alone. Neither crosses process boundaries.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of base names with an active pipeline run.
#[derive(Clone, Default)]
pub struct ClaimRegistry {
    in_flight: Arc<Mutex<HashSet<OsString>>>,
}

impl fmt::Debug for ClaimRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimRegistry")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, or `None` if another run already holds it.
    pub fn try_claim(&self, name: &OsStr) -> Option<Claim> {
        let mut guard = self.lock();
        if !guard.insert(name.to_os_string()) {
            return None;
        }
        Some(Claim {
            registry: self.clone(),
            name: name.to_os_string(),
        })
    }

    pub fn is_claimed(&self, name: &OsStr) -> bool {
        self.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<OsString>> {
        // The set stays consistent even if a holder panicked mid-insert
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Released on drop.
pub struct Claim {
    registry: ClaimRegistry,
    name: OsString,
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim").field("name", &self.name).finish()
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.name);
    }
}

/// Base names whose last run failed to transcode.
#[derive(Clone, Default)]
pub struct FailureLedger {
    failed: Arc<Mutex<HashSet<OsString>>>,
}

impl fmt::Debug for FailureLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureLedger")
            .field("failed", &self.lock().len())
            .finish()
    }
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &OsStr) {
        self.lock().insert(name.to_os_string());
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        self.lock().contains(name)
    }

    /// Returns true if `name` was recorded.
    pub fn forget(&self, name: &OsStr) -> bool {
        self.lock().remove(name)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<OsString>> {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
