//! Splitting downloaded pages into per-record RDF files.
//!
//! The extraction pass reads every `<offset>.xml` page in the page directory
//! and writes each record it finds to `<offset>_<index>.rdf`. Pages are
//! independent, so they are processed in parallel on the blocking thread
//! pool; the offset/index naming keeps every output path unique.
//!
//! Each page is read fully into memory and scanned as raw bytes; record
//! bodies are copied through unchanged whatever their encoding. Pages hold
//! at most 500 records, which keeps memory bounded.

mod record;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use record::{SCORE_MARKER, XML_DECLARATION, record_bodies, standalone_record, strip_score};

use crate::fetch::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::progress::Progress;
use crate::storage::{self, Stage, StorageError};

/// Errors produced by the extraction pass.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A directory precondition failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Reading a page or writing a record failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A worker panicked while processing a page.
    #[error("extraction of {} panicked", path.display())]
    Panicked {
        /// The page being processed.
        path: PathBuf,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

impl ExtractError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Outcome of an extraction pass.
#[derive(Debug, Default)]
pub struct ExtractReport {
    pages: usize,
    records: usize,
    skipped: Vec<PathBuf>,
}

impl ExtractReport {
    /// Page files processed.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Record files written.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Entries of the page directory that are not page files.
    #[must_use]
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }
}

/// Extracts records from a directory of downloaded pages.
#[derive(Debug)]
pub struct RecordExtractor {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl RecordExtractor {
    /// Creates an extractor processing up to `concurrency` pages at a time.
    ///
    /// The value is clamped to the same 1..=100 range as the fetch engine.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Writes every record of every page in `page_dir` to `record_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoInput`] (wrapped) when `page_dir` holds no
    /// `<offset>.xml` page files and
    /// [`StorageError::DirectoryNotEmpty`] when `record_dir` already has
    /// content; both are checked before anything is written. Otherwise the
    /// first page error is returned after all pages have been attempted.
    #[instrument(skip(self, progress), fields(page_dir = %page_dir.display(), record_dir = %record_dir.display()))]
    pub async fn extract(
        &self,
        page_dir: &Path,
        record_dir: &Path,
        progress: Arc<Progress>,
    ) -> Result<ExtractReport, ExtractError> {
        storage::ensure_has_input(page_dir)?;
        storage::ensure_empty(record_dir, Stage::Records)?;

        let (pages, skipped) = storage::list_pages(page_dir)?;
        for path in &skipped {
            warn!(path = %path.display(), "skipping file that is not a page");
        }
        if pages.is_empty() {
            return Err(StorageError::NoInput {
                path: page_dir.to_path_buf(),
            }
            .into());
        }
        storage::create_dir(record_dir)?;

        progress.set_total(pages.len() as u64);
        info!(pages = pages.len(), "starting record extraction");

        let mut handles: Vec<(PathBuf, JoinHandle<Result<usize, ExtractError>>)> = Vec::new();
        for (offset, path) in pages {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| ExtractError::SemaphoreClosed)?;

            let record_dir = record_dir.to_path_buf();
            let progress = Arc::clone(&progress);
            let page_path = path.clone();
            progress.record_started();

            handles.push((
                path,
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let result = extract_page(&page_path, offset, &record_dir);
                    match &result {
                        Ok(_) => progress.record_succeeded(),
                        Err(_) => progress.record_failed(),
                    }
                    result
                }),
            ));
        }

        let mut report = ExtractReport {
            skipped,
            ..ExtractReport::default()
        };
        let mut first_error = None;

        for (path, handle) in handles {
            match handle.await {
                Ok(Ok(records)) => {
                    report.pages += 1;
                    report.records += records;
                }
                Ok(Err(e)) => {
                    warn!(path = %path.display(), error = %e, "page extraction failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "page extraction panicked");
                    progress.record_failed();
                    first_error.get_or_insert(ExtractError::Panicked { path });
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            pages = report.pages,
            records = report.records,
            "record extraction complete"
        );
        Ok(report)
    }
}

/// Splits one page file into record files, returning how many were written.
///
/// # Errors
///
/// Returns [`ExtractError::Io`] if the page cannot be read or a record file
/// cannot be created (including when it already exists).
pub fn extract_page(
    page_path: &Path,
    page_offset: u64,
    record_dir: &Path,
) -> Result<usize, ExtractError> {
    let contents = std::fs::read(page_path).map_err(|e| ExtractError::io(page_path, e))?;

    let mut written = 0;
    for (index, body) in record_bodies(&contents).enumerate() {
        let path = storage::record_path(record_dir, page_offset, index);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| ExtractError::io(&path, e))?;
        file.write_all(&standalone_record(body))
            .map_err(|e| ExtractError::io(&path, e))?;
        written += 1;
    }

    debug!(page = %page_path.display(), records = written, "page extracted");
    Ok(written)
}
