//! Shared database availability state.
//!
//! One instance is created at startup and handed by `Arc` to the probe, the
//! pool facade, the bootstrapper and the health aggregator. Only the probe
//! writes the reachability flag; only the bootstrapper touches the schema latch.

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Availability {
    /// Last-known reachability. Starts false.
    reachable: AtomicBool,

    /// One-shot latch set once the schema is known to exist.
    schema_initialized: AtomicBool,

    /// Server version string reported by the last successful transition to up.
    version: ArcSwapOption<String>,
}

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last probe result. Never blocks.
    pub fn is_available(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    pub fn is_schema_initialized(&self) -> bool {
        self.schema_initialized.load(Ordering::Acquire)
    }

    pub fn version(&self) -> Option<Arc<String>> {
        self.version.load_full()
    }

    /// Store a probe result, returning the previous value.
    pub(crate) fn swap_available(&self, reachable: bool) -> bool {
        self.reachable.swap(reachable, Ordering::AcqRel)
    }

    pub(crate) fn set_version(&self, version: String) {
        self.version.store(Some(Arc::new(version)));
    }

    pub(crate) fn clear_version(&self) {
        self.version.store(None);
    }

    /// Claim the schema latch. Returns false if it was already set.
    pub(crate) fn try_claim_schema(&self) -> bool {
        self.schema_initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Re-arm the latch after a failed bootstrap.
    pub(crate) fn reset_schema(&self) {
        self.schema_initialized.store(false, Ordering::Release);
    }
}
