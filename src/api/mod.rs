//! Client for the K-samsök (SOCH) search API.
//!
//! # Example
//!
//! ```no_run
//! use soch_download::api::{ClientConfig, SearchClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SearchClient::new(ClientConfig::default().with_api_key("test"))?;
//! let hits = client.total_hits("geoDataExists=j").await?;
//! println!("{hits} records match");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;

pub use client::{ClientConfig, KeyStatus, SearchClient, is_success_status, parse_total_hits};
pub use constants::{DEFAULT_API_KEY, DEFAULT_ENDPOINT, PAGE_SIZE};
pub use error::ApiError;
