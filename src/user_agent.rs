//! Shared User-Agent string for search API traffic.

/// Product token the service sees on every request.
const PRODUCT: &str = "SOCH Download CLI";

/// Default User-Agent for all API requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version}")
}
