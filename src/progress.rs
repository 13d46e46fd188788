//! Thread-safe progress counters shared between workers and an observer.
//!
//! Workers advance the counters; a UI task (or a test) reads them. All
//! counters only ever grow during a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Progress of one pipeline stage.
#[derive(Debug, Default)]
pub struct Progress {
    total: AtomicU64,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Progress {
    /// Creates a counter set with everything at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units the stage will process, once known.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Units handed to a worker so far.
    #[must_use]
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Units that finished successfully.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Units that finished with an error.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Units that finished either way.
    #[must_use]
    pub fn finished(&self) -> u64 {
        self.succeeded() + self.failed()
    }

    /// Returns true once every unit of a known total has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        let total = self.total();
        total > 0 && self.finished() >= total
    }

    pub(crate) fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub(crate) fn record_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}
