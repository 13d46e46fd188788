//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use soch_download::api::DEFAULT_API_KEY;
use soch_download::api::DEFAULT_ENDPOINT;
use soch_download::api::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};

/// Multithreaded batch downloads of Swedish Open Cultural Heritage (K-samsök) records.
///
/// Downloads every result page of a search into the raw data directory, or
/// with --unpack splits downloaded pages into one RDF file per record.
#[derive(Parser, Debug)]
#[command(name = "soch-download")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// What to download: geodata-exists, all, institution, query, color-exists, keyword-exists
    #[arg(long, default_value = "all")]
    pub action: String,

    /// SOCH API key
    #[arg(long, env = "SOCH_API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true)]
    pub key: String,

    /// The institution abbreviation (only applies if action=institution)
    #[arg(long)]
    pub institution: Option<String>,

    /// SOCH search query string (only applies if action=query)
    #[arg(long)]
    pub query: Option<String>,

    /// Unpack the XML downloads into RDF files instead of downloading
    #[arg(long)]
    pub unpack: bool,

    /// Start the download without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Concurrent workers (1-100, defaults to the number of CPUs)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Directory receiving raw XML pages
    #[arg(long, default_value = "raw_data")]
    pub page_dir: PathBuf,

    /// Directory receiving unpacked RDF records
    #[arg(long, default_value = "rdf_data")]
    pub record_dir: PathBuf,

    /// Search API endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// Per-request timeout in seconds, body included (1-3600)
    #[arg(long, default_value_t = REQUEST_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub request_timeout: u64,
}
