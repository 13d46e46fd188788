//! Fetch engine for concurrent page downloads.
//!
//! This module provides the [`FetchEngine`] which executes a [`PagePlan`]
//! using a semaphore-based worker pool. Every page is streamed straight to
//! its own file, so workers never share anything but the progress counters.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use soch_download::api::{ClientConfig, SearchClient};
//! use soch_download::fetch::FetchEngine;
//! use soch_download::plan::QueryPlanner;
//! use soch_download::Progress;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SearchClient::new(ClientConfig::default())?;
//! let plan = QueryPlanner::new(client.clone()).plan("geoDataExists=j").await?;
//! let engine = FetchEngine::with_default_concurrency(client);
//! let report = engine.run(&plan, Path::new("raw_data"), Arc::new(Progress::new())).await?;
//! println!("Fetched: {}, Failed: {}", report.completed(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, SearchClient};
use crate::plan::PagePlan;
use crate::progress::Progress;
use crate::storage::{self, Stage, StorageError};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Worker count used when none is configured: one per available CPU.
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map_or(MIN_CONCURRENCY, std::num::NonZeroUsize::get)
        .clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// Error type for fetch engine operations.
///
/// Individual page failures are not errors of the run; they are collected
/// in the [`FetchReport`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The page directory failed its precondition check.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// A page that could not be fetched.
#[derive(Debug)]
pub struct PageFailure {
    /// Offset of the failed page.
    pub start_offset: u64,
    /// What went wrong.
    pub reason: String,
}

/// Outcome of a fetch run.
#[derive(Debug, Default)]
pub struct FetchReport {
    completed: usize,
    bytes: u64,
    failures: Vec<PageFailure>,
    missing: Vec<u64>,
}

impl FetchReport {
    /// Pages written successfully.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Pages that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Total bytes written across all pages.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Failed pages, ordered by offset.
    #[must_use]
    pub fn failures(&self) -> &[PageFailure] {
        &self.failures
    }

    /// Offsets of the plan with no page file on disk after the run.
    #[must_use]
    pub fn missing(&self) -> &[u64] {
        &self.missing
    }

    /// Returns true when every page of the plan is on disk.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.missing.is_empty()
    }
}

/// Fetch engine executing page plans with a fixed number of workers.
///
/// # Concurrency Model
///
/// - Each page runs in its own Tokio task
/// - A semaphore permit is acquired before dispatching each page
/// - Permits are released automatically when the page finishes (RAII)
/// - `run` returns only after every dispatched task has been joined
#[derive(Debug)]
pub struct FetchEngine {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
    /// Shared client for page requests.
    client: SearchClient,
}

impl FetchEngine {
    /// Creates a new fetch engine with the given worker count.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug", skip(client))]
    pub fn new(client: SearchClient, concurrency: usize) -> Result<Self, FetchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(FetchError::InvalidConcurrency { value: concurrency });
        }

        Ok(Self::with_workers(client, concurrency))
    }

    /// Creates a fetch engine with one worker per available CPU.
    #[must_use]
    pub fn with_default_concurrency(client: SearchClient) -> Self {
        Self::with_workers(client, default_concurrency())
    }

    /// `concurrency` must already be within 1..=100.
    fn with_workers(client: SearchClient, concurrency: usize) -> Self {
        debug!(concurrency, "creating fetch engine");
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            client,
        }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every page of `plan` into `page_dir`.
    ///
    /// This method:
    /// 1. Checks that `page_dir` is empty (creating it when missing)
    /// 2. Dispatches one task per page, up to the concurrency limit
    /// 3. Streams each response body to `<page_dir>/<offset>.xml`
    /// 4. Waits for every task, then checks that each offset has a file
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Storage`] if `page_dir` is not empty or cannot be
    /// created; no request is issued in that case.
    /// Returns [`FetchError::SemaphoreClosed`] if the semaphore is closed.
    ///
    /// Note: Individual page failures do NOT cause this method to error.
    /// They are listed in the returned report.
    #[instrument(skip(self, plan, progress), fields(page_dir = %page_dir.display(), pages = plan.page_count()))]
    pub async fn run(
        &self,
        plan: &PagePlan,
        page_dir: &Path,
        progress: Arc<Progress>,
    ) -> Result<FetchReport, FetchError> {
        storage::ensure_empty(page_dir, Stage::Pages)?;
        storage::create_dir(page_dir)?;

        progress.set_total(plan.page_count());
        info!(concurrency = self.concurrency, "starting page fetch");

        let mut handles: Vec<(u64, JoinHandle<Result<u64, ApiError>>)> = Vec::new();

        for request in plan.requests() {
            // Blocks while all workers are busy
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| FetchError::SemaphoreClosed)?;

            let start_offset = request.start_offset;
            let path = storage::page_path(page_dir, start_offset);
            let client = self.client.clone();
            let progress = Arc::clone(&progress);

            progress.record_started();
            debug!(start_offset, "dispatched page");

            handles.push((
                start_offset,
                tokio::spawn(async move {
                    let _permit = permit;

                    let result = client.download_page(&request, &path).await;
                    match &result {
                        Ok(bytes) => {
                            debug!(start_offset, bytes, "page written");
                            progress.record_succeeded();
                        }
                        Err(e) => {
                            warn!(start_offset, error = %e, "page fetch failed");
                            progress.record_failed();
                        }
                    }
                    result
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for page fetches to complete");

        let mut report = FetchReport::default();
        for (start_offset, handle) in handles {
            match handle.await {
                Ok(Ok(bytes)) => {
                    report.completed += 1;
                    report.bytes += bytes;
                }
                Ok(Err(e)) => report.failures.push(PageFailure {
                    start_offset,
                    reason: e.to_string(),
                }),
                Err(e) => {
                    // The task never reached its own progress update
                    warn!(start_offset, error = %e, "page task panicked");
                    progress.record_failed();
                    report.failures.push(PageFailure {
                        start_offset,
                        reason: format!("task panicked: {e}"),
                    });
                }
            }
        }

        report.missing = missing_offsets(plan, page_dir).await;

        info!(
            completed = report.completed,
            failed = report.failed(),
            missing = report.missing.len(),
            bytes = report.bytes,
            "page fetch complete"
        );

        Ok(report)
    }
}

/// Offsets of `plan` that have no page file in `page_dir`.
async fn missing_offsets(plan: &PagePlan, page_dir: &Path) -> Vec<u64> {
    let mut missing = Vec::new();
    for offset in plan.offsets() {
        let path = storage::page_path(page_dir, offset);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            missing.push(offset);
        }
    }
    missing
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ClientConfig;

    fn test_client() -> SearchClient {
        SearchClient::new(ClientConfig::default()).unwrap()
    }

    #[test]
    fn test_engine_new_valid_concurrency() {
        let engine = FetchEngine::new(test_client(), 1).unwrap();
        assert_eq!(engine.concurrency(), 1);

        let engine = FetchEngine::new(test_client(), 100).unwrap();
        assert_eq!(engine.concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency_zero() {
        let result = FetchEngine::new(test_client(), 0);
        assert!(matches!(
            result,
            Err(FetchError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_engine_new_invalid_concurrency_too_high() {
        let result = FetchEngine::new(test_client(), 101);
        assert!(matches!(
            result,
            Err(FetchError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_default_concurrency_is_bounded() {
        let concurrency = default_concurrency();
        assert!((MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency));

        let engine = FetchEngine::with_default_concurrency(test_client());
        assert_eq!(engine.concurrency(), concurrency);
    }

    #[test]
    fn test_engine_constructors_size_the_worker_pool() {
        let engine = FetchEngine::new(test_client(), 7).unwrap();
        assert_eq!(engine.semaphore.available_permits(), 7);

        let engine = FetchEngine::with_default_concurrency(test_client());
        assert_eq!(
            engine.semaphore.available_permits(),
            default_concurrency()
        );
    }

    #[test]
    fn test_engine_error_display() {
        let error = FetchError::InvalidConcurrency { value: 0 };
        let msg = error.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_report_completeness() {
        let report = FetchReport::default();
        assert!(report.is_complete());

        let report = FetchReport {
            completed: 1,
            bytes: 10,
            failures: vec![PageFailure {
                start_offset: 500,
                reason: "HTTP 500".to_string(),
            }],
            missing: vec![500],
        };
        assert!(!report.is_complete());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.missing(), &[500]);
    }

    #[test]
    fn test_missing_offsets_lists_absent_pages() {
        let temp = tempfile::TempDir::new().unwrap();
        let plan = PagePlan::new("*", 1200, 500).unwrap();
        std::fs::write(storage::page_path(temp.path(), 0), b"<result/>").unwrap();
        std::fs::write(storage::page_path(temp.path(), 1000), b"<result/>").unwrap();

        let missing = tokio_test::block_on(missing_offsets(&plan, temp.path()));
        assert_eq!(missing, vec![500]);
    }
}
