//! Error types for search API requests.
//!
//! Every variant carries the request URL so failures can be traced back to
//! the exact page or probe that produced them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the search API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The service answered with a status outside the 200..=399 range.
    #[error("SOCH returned HTTP {status} for {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body did not contain the expected total hit count.
    #[error("SOCH response for {url} has no totalHits element")]
    MalformedResponse {
        /// The URL whose response could not be interpreted.
        url: String,
    },

    /// The configured endpoint cannot be turned into a request URL.
    #[error("invalid endpoint URL: {endpoint}")]
    InvalidEndpoint {
        /// The endpoint as configured.
        endpoint: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while writing a response body to disk.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Creates a network error, promoting reqwest timeouts to [`ApiError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a malformed response error.
    pub fn malformed(url: impl Into<String>) -> Self {
        Self::MalformedResponse { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the error came from the remote side rather than
    /// from local I/O.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error does not carry.
