//! CLI entry point for the soch-download tool.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod app;
mod cli;

use app::{runtime, terminal};
use cli::Args;

/// Outcome of a run, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Everything requested was done (or the user declined).
    Success,
    /// Some pages could not be downloaded.
    Partial,
    /// Nothing could be done.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    terminal::init_tracing(terminal::default_log_level(args.quiet, args.verbose));

    debug!(
        action = %args.action,
        unpack = args.unpack,
        concurrency = ?args.concurrency,
        page_dir = %args.page_dir.display(),
        record_dir = %args.record_dir.display(),
        "CLI arguments parsed"
    );

    match runtime::run(args).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
