//! Constants for the search API client (endpoint, paging, timeouts).

/// Default K-samsök search endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://www.kulturarvsdata.se/ksamsok/api";

/// Public key accepted by the service for evaluation use.
pub const DEFAULT_API_KEY: &str = "test";

/// Records per page requested from the service.
pub const PAGE_SIZE: u64 = 500;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default total request timeout (5 minutes for large pages).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;
