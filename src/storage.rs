//! On-disk layout for page and record files.
//!
//! Pages live in `<page_dir>/<start_offset>.xml`, records in
//! `<record_dir>/<page_offset>_<index>.rdf`. Both directories must be empty
//! when their stage starts so runs never mix. Hidden entries (names starting
//! with `.`) are ignored when checking for emptiness.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extension of raw page files.
pub const PAGE_EXTENSION: &str = "xml";

/// Extension of extracted record files.
pub const RECORD_EXTENSION: &str = "rdf";

/// Pipeline stage a directory belongs to, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Raw page downloads.
    Pages,
    /// Extracted records.
    Records,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pages => write!(f, "raw data"),
            Self::Records => write!(f, "RDF data"),
        }
    }
}

/// Errors from directory precondition checks.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The target directory of a stage already has content.
    #[error("the {stage} directory {} is not empty", path.display())]
    DirectoryNotEmpty {
        /// Stage the directory belongs to.
        stage: Stage,
        /// The offending directory.
        path: PathBuf,
    },

    /// There are no page files to extract from.
    #[error("the data directory {} is empty, nothing to unpack", path.display())]
    NoInput {
        /// The empty page directory.
        path: PathBuf,
    },

    /// A directory could not be listed or created.
    #[error("IO error accessing {}: {source}", path.display())]
    Io {
        /// The directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Returns true when `dir` is missing or holds only hidden entries.
///
/// # Errors
///
/// Returns [`StorageError::Io`] when an existing directory cannot be read.
pub fn is_effectively_empty(dir: &Path) -> Result<bool, StorageError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        if !is_hidden(&entry.file_name().to_string_lossy()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Fails with [`StorageError::DirectoryNotEmpty`] unless `dir` is effectively empty.
///
/// # Errors
///
/// See [`is_effectively_empty`].
pub fn ensure_empty(dir: &Path, stage: Stage) -> Result<(), StorageError> {
    if is_effectively_empty(dir)? {
        Ok(())
    } else {
        Err(StorageError::DirectoryNotEmpty {
            stage,
            path: dir.to_path_buf(),
        })
    }
}

/// Fails with [`StorageError::NoInput`] when `dir` has nothing to read.
///
/// # Errors
///
/// See [`is_effectively_empty`].
pub fn ensure_has_input(dir: &Path) -> Result<(), StorageError> {
    if is_effectively_empty(dir)? {
        Err(StorageError::NoInput {
            path: dir.to_path_buf(),
        })
    } else {
        Ok(())
    }
}

/// Creates `dir` (and parents) if it does not exist yet.
///
/// # Errors
///
/// Returns [`StorageError::Io`] when the directory cannot be created.
pub fn create_dir(dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))
}

/// Path of the page file holding the page starting at `start_offset`.
#[must_use]
pub fn page_path(page_dir: &Path, start_offset: u64) -> PathBuf {
    page_dir.join(format!("{start_offset}.{PAGE_EXTENSION}"))
}

/// Path of the record file for record `index` of the page at `page_offset`.
#[must_use]
pub fn record_path(record_dir: &Path, page_offset: u64, index: usize) -> PathBuf {
    record_dir.join(format!("{page_offset}_{index}.{RECORD_EXTENSION}"))
}

/// Recovers the start offset from a page file path such as `raw_data/1500.xml`.
///
/// Returns `None` for files that are not page files.
#[must_use]
pub fn page_offset(path: &Path) -> Option<u64> {
    let is_page = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PAGE_EXTENSION));
    if !is_page {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Lists page files in `page_dir` with their offsets, sorted by offset.
///
/// Entries that are not `<offset>.xml` files are returned separately so the
/// caller can report them.
///
/// # Errors
///
/// Returns [`StorageError::Io`] when the directory cannot be read.
pub fn list_pages(page_dir: &Path) -> Result<(Vec<(u64, PathBuf)>, Vec<PathBuf>), StorageError> {
    let mut pages = Vec::new();
    let mut skipped = Vec::new();

    let entries = std::fs::read_dir(page_dir).map_err(|e| StorageError::io(page_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(page_dir, e))?;
        let path = entry.path();
        if is_hidden(&entry.file_name().to_string_lossy()) || !path.is_file() {
            continue;
        }
        match page_offset(&path) {
            Some(offset) => pages.push((offset, path)),
            None => skipped.push(path),
        }
    }

    pages.sort_by_key(|(offset, _)| *offset);
    Ok((pages, skipped))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(is_effectively_empty(&temp.path().join("raw_data")).unwrap());
    }

    #[test]
    fn test_hidden_files_are_ignored() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".gitkeep"), b"").unwrap();
        assert!(is_effectively_empty(temp.path()).unwrap());
        assert!(ensure_empty(temp.path(), Stage::Pages).is_ok());
    }

    #[test]
    fn test_ensure_empty_rejects_visible_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("0.xml"), b"<result/>").unwrap();

        let err = ensure_empty(temp.path(), Stage::Pages).unwrap_err();
        assert!(matches!(
            err,
            StorageError::DirectoryNotEmpty {
                stage: Stage::Pages,
                ..
            }
        ));
        assert!(err.to_string().contains("raw data directory"));
    }

    #[test]
    fn test_ensure_has_input_on_empty_dir() {
        let temp = TempDir::new().unwrap();
        let err = ensure_has_input(temp.path()).unwrap_err();
        assert!(matches!(err, StorageError::NoInput { .. }));
        assert!(err.to_string().contains("nothing to unpack"));
    }

    #[test]
    fn test_page_and_record_paths() {
        let dir = Path::new("data");
        assert_eq!(page_path(dir, 1500), Path::new("data/1500.xml"));
        assert_eq!(record_path(dir, 1500, 3), Path::new("data/1500_3.rdf"));
    }

    #[test]
    fn test_page_offset_parsing() {
        assert_eq!(page_offset(Path::new("raw_data/0.xml")), Some(0));
        assert_eq!(page_offset(Path::new("run2/raw_data/2500.xml")), Some(2500));
        assert_eq!(page_offset(Path::new("raw_data/2500.rdf")), None);
        assert_eq!(page_offset(Path::new("raw_data/notes.xml")), None);
        assert_eq!(page_offset(Path::new("raw_data/-5.xml")), None);
        assert_eq!(page_offset(Path::new("raw_data/.xml")), None);
    }

    #[test]
    fn test_list_pages_sorts_and_separates() {
        let temp = TempDir::new().unwrap();
        for name in ["1000.xml", "0.xml", "500.xml", "readme.txt", ".hidden.xml"] {
            std::fs::write(temp.path().join(name), b"").unwrap();
        }

        let (pages, skipped) = list_pages(temp.path()).unwrap();
        let offsets: Vec<u64> = pages.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![0, 500, 1000]);
        assert_eq!(skipped.len(), 1);
        assert!(skipped[0].ends_with("readme.txt"));
    }
}
