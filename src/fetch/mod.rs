//! Concurrent page downloads.
//!
//! # Features
//!
//! - Fixed-size worker pool (one worker per CPU by default)
//! - Streaming downloads straight to `<offset>.xml` page files
//! - Per-page failure isolation with a summary of failed and missing offsets
//! - Atomic progress counters for an external observer

mod engine;

pub use engine::{
    FetchEngine, FetchError, FetchReport, MAX_CONCURRENCY, MIN_CONCURRENCY, PageFailure,
    default_concurrency,
};
