//! SOCH Download Core Library
//!
//! This library provides bulk downloads of Swedish Open Cultural Heritage
//! (K-samsök) search results for offline processing and analytics.
//!
//! # Architecture
//!
//! The pipeline has three stages, handing data to each other only through
//! the filesystem:
//! - [`plan`] - Probes the hit count of a predicate and computes the page plan
//! - [`fetch`] - Downloads every page concurrently, streaming to `<offset>.xml`
//! - [`extract`] - Splits pages into standalone `<offset>_<index>.rdf` records
//!
//! Supporting modules:
//! - [`api`] - Search API client and request context
//! - [`action`] - Named download actions and their predicates
//! - [`storage`] - Directory preconditions and file naming
//! - [`progress`] - Atomic counters observed by progress displays

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod api;
pub mod extract;
pub mod fetch;
pub mod plan;
pub mod progress;
pub mod storage;
mod user_agent;

// Re-export commonly used types
pub use action::{Action, ActionError};
pub use api::{ApiError, ClientConfig, KeyStatus, PAGE_SIZE, SearchClient};
pub use extract::{ExtractError, ExtractReport, RecordExtractor};
pub use fetch::{FetchEngine, FetchError, FetchReport, PageFailure, default_concurrency};
pub use plan::{PagePlan, PageRequest, PlanError, QueryPlanner};
pub use progress::Progress;
pub use storage::{Stage, StorageError};
