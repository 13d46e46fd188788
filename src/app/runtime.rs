use std::collections::BTreeSet;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use soch_download::storage::{self, Stage};
use soch_download::{
    ClientConfig, FetchEngine, FetchReport, Progress, QueryPlanner, RecordExtractor, SearchClient,
    default_concurrency,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{confirm, exit_handler, progress_manager, terminal, validation};
use crate::cli::Args;

pub(crate) async fn run(args: Args) -> Result<ProcessExit> {
    let concurrency = args
        .concurrency
        .map_or_else(default_concurrency, usize::from);
    let use_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );

    if args.unpack {
        return run_unpack(&args, concurrency, use_bar).await;
    }
    run_download(&args, concurrency, use_bar).await
}

async fn run_unpack(args: &Args, concurrency: usize, use_bar: bool) -> Result<ProcessExit> {
    info!("Starting unpacking");

    let extractor = RecordExtractor::new(concurrency);
    let progress = Arc::new(Progress::new());
    let (handle, stop) =
        progress_manager::spawn_progress_ui(use_bar, Arc::clone(&progress), "Unpacking");

    let result = extractor
        .extract(&args.page_dir, &args.record_dir, progress)
        .await;
    progress_manager::stop_progress_ui(handle, &stop).await;
    let report = result?;

    if !args.quiet {
        println!(
            "Done! Unpacked {} records from {} pages into {}",
            report.records(),
            report.pages(),
            args.record_dir.display()
        );
    }
    Ok(ProcessExit::Success)
}

async fn run_download(args: &Args, concurrency: usize, use_bar: bool) -> Result<ProcessExit> {
    info!("Validating arguments");

    let predicate = validation::resolve_predicate(
        &args.action,
        args.institution.as_deref(),
        args.query.as_deref(),
    )?;
    storage::ensure_empty(&args.page_dir, Stage::Pages)?;

    let client = SearchClient::new(ClientConfig {
        endpoint: args.endpoint.clone(),
        api_key: args.key.clone(),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        request_timeout: Duration::from_secs(args.request_timeout),
    })?;
    validation::ensure_valid_key(&client).await?;

    info!("Fetching query data and calculating requirements");
    let plan = QueryPlanner::new(client.clone())
        .plan(&predicate)
        .await
        .context("could not plan the download")?;

    let confirmed = if args.yes {
        if !args.quiet {
            confirm::write_plan_summary(&plan, concurrency, &mut io::stdout())?;
        }
        true
    } else {
        confirm::ask_to_proceed(
            plan.clone(),
            concurrency,
            io::BufReader::new(io::stdin()),
            io::stdout(),
        )
        .await?
    };
    if !confirmed {
        info!("Download cancelled, nothing was written");
        return Ok(ProcessExit::Success);
    }

    info!("Preparing download");
    let engine = FetchEngine::new(client, concurrency)?;
    let progress = Arc::new(Progress::new());
    let (handle, stop) =
        progress_manager::spawn_progress_ui(use_bar, Arc::clone(&progress), "Downloading");

    let result = engine.run(&plan, &args.page_dir, progress).await;
    progress_manager::stop_progress_ui(handle, &stop).await;
    let report = result?;

    let incomplete = incomplete_offsets(&report);
    report_incomplete(&incomplete);
    if incomplete.is_empty() && !args.quiet {
        println!(
            "Done! Downloaded {} pages into {}",
            report.completed(),
            args.page_dir.display()
        );
    }

    Ok(exit_handler::determine_exit_outcome(
        report.completed(),
        incomplete.len(),
    ))
}

/// Offsets that failed or have no page file, deduplicated and sorted.
fn incomplete_offsets(report: &FetchReport) -> BTreeSet<u64> {
    report
        .failures()
        .iter()
        .map(|failure| failure.start_offset)
        .chain(report.missing().iter().copied())
        .collect()
}

fn report_incomplete(incomplete: &BTreeSet<u64>) {
    if incomplete.is_empty() {
        debug!("every page of the plan is on disk");
        return;
    }
    warn!(pages = incomplete.len(), "download incomplete");
    let offsets = incomplete
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    eprintln!(
        "Download incomplete: {} pages failed. Missing start offsets: {offsets}",
        incomplete.len()
    );
}
