//! HTTP client wrapper for the K-samsök search API.
//!
//! [`SearchClient`] owns the connection pool and the request context (endpoint,
//! API key, timeouts). It knows how to build search URLs, probe the total hit
//! count for a predicate, validate the API key, and stream a result page to
//! disk without holding the document in memory.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use futures_util::StreamExt;
use regex::Regex;
use reqwest::Client;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_API_KEY, DEFAULT_ENDPOINT, REQUEST_TIMEOUT_SECS,
};
use super::error::ApiError;
use crate::plan::PageRequest;
use crate::user_agent;

#[allow(clippy::expect_used)]
static TOTAL_HITS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<totalHits>\s*(\d+)\s*</totalHits>").expect("totalHits regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static SERVICE_ERROR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<error>(.*?)</error>").expect("service error regex is valid") // Static pattern, safe to panic
});

/// Request context for [`SearchClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the search API.
    pub endpoint: String,
    /// API key sent as the `x-api` parameter.
    pub api_key: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Total timeout for one request, body included.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Returns a copy of this config using a different API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Returns a copy of this config using a different endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Outcome of validating an API key against the service.
///
/// Network failures are reported through `Err(ApiError)` instead, so an
/// unreachable service is never mistaken for a bad key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// The service accepted the key.
    Valid,
    /// The service rejected the key.
    Invalid {
        /// Reason reported by the service, if any.
        reason: String,
    },
}

/// Client for the search API.
///
/// Created once per run and cloned into fetch workers; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl SearchClient {
    /// Builds a client from the given request context.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidEndpoint`] if the endpoint is not an absolute
    /// URL, or [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    #[instrument(level = "debug", skip(config), fields(endpoint = %config.endpoint))]
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|_| ApiError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
        })?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| ApiError::ClientBuild { source })?;

        debug!(
            connect_timeout_ms = config.connect_timeout.as_millis(),
            request_timeout_ms = config.request_timeout.as_millis(),
            "created search client"
        );

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
        })
    }

    /// Builds the search URL for one page of results.
    #[must_use]
    pub fn search_url(&self, predicate: &str, hits_per_page: u64, start_record: u64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("x-api", &self.api_key)
            .append_pair("method", "search")
            .append_pair("query", predicate)
            .append_pair("hitsPerPage", &hits_per_page.to_string())
            .append_pair("startRecord", &start_record.to_string());
        url
    }

    /// Fetches the total number of records matching `predicate`.
    ///
    /// Issues a single one-hit probe request and reads the `totalHits`
    /// element of the response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpStatus`] for statuses outside 200..=399,
    /// [`ApiError::MalformedResponse`] when the count is missing, and
    /// network/timeout errors as they occur.
    #[instrument(skip(self))]
    pub async fn total_hits(&self, predicate: &str) -> Result<u64, ApiError> {
        let url = self.search_url(predicate, 1, 0);
        let body = self.get_text(&url).await?;
        let hits = parse_total_hits(&body).ok_or_else(|| ApiError::malformed(url.as_str()))?;
        debug!(hits, "probe complete");
        Ok(hits)
    }

    /// Checks whether the service accepts the configured API key.
    ///
    /// # Errors
    ///
    /// Returns an error when the service cannot be reached or answers with a
    /// status that says nothing about the key (e.g. 5xx).
    #[instrument(skip(self))]
    pub async fn validate_key(&self) -> Result<KeyStatus, ApiError> {
        let url = self.search_url("*", 1, 0);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::network(url.as_str(), e))?;

        let status = response.status().as_u16();
        if matches!(status, 401 | 403) {
            return Ok(KeyStatus::Invalid {
                reason: format!("HTTP {status}"),
            });
        }
        if !is_success_status(status) {
            return Err(ApiError::http_status(url.as_str(), status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(url.as_str(), e))?;
        if let Some(reason) = parse_service_error(&body) {
            return Ok(KeyStatus::Invalid { reason });
        }
        Ok(KeyStatus::Valid)
    }

    /// Streams one result page to `path`, returning the number of bytes written.
    ///
    /// The file is created exclusively (an existing file is an error) and only
    /// after the service has answered with a success status. A transfer that
    /// fails midway removes the partial file.
    ///
    /// # Errors
    ///
    /// Returns network/status errors from the request and [`ApiError::Io`]
    /// for failures creating or writing the file.
    #[instrument(skip(self, request, path), fields(start_offset = request.start_offset, path = %path.display()))]
    pub async fn download_page(&self, request: &PageRequest, path: &Path) -> Result<u64, ApiError> {
        let url = self.search_url(&request.predicate, request.page_size, request.start_offset);
        let response = self.send_checked(&url).await?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| ApiError::io(path, e))?;

        let result = stream_to_file(&mut file, response, url.as_str(), path).await;
        if result.is_err() {
            drop(file);
            remove_partial_page(path).await;
        }
        result
    }

    async fn get_text(&self, url: &Url) -> Result<String, ApiError> {
        let response = self.send_checked(url).await?;
        response
            .text()
            .await
            .map_err(|e| ApiError::network(url.as_str(), e))
    }

    async fn send_checked(&self, url: &Url) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::network(url.as_str(), e))?;

        let status = response.status().as_u16();
        if !is_success_status(status) {
            return Err(ApiError::http_status(url.as_str(), status));
        }
        Ok(response)
    }
}

/// Returns true for statuses the service uses to signal success (200..=399).
#[must_use]
pub fn is_success_status(status: u16) -> bool {
    (200..=399).contains(&status)
}

/// Extracts the `totalHits` count from a search response body.
#[must_use]
pub fn parse_total_hits(body: &str) -> Option<u64> {
    TOTAL_HITS_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_service_error(body: &str) -> Option<String> {
    SERVICE_ERROR_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Deletes a page file left behind by a failed transfer.
///
/// A file that cannot be removed is logged, since the missing-page check
/// would otherwise count it as present.
async fn remove_partial_page(path: &Path) {
    debug!(path = %path.display(), "removing partial page file after error");
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "could not remove partial page file"
        ),
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, ApiError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| ApiError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ApiError::io(path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| ApiError::io(path, e))?;

    Ok(bytes_written)
}
