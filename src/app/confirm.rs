//! Interactive confirmation before a bulk download starts.

use std::io::{self, BufRead, Write};

use soch_download::PagePlan;

/// Prints the plan summary to `output` and asks whether to proceed.
///
/// Returns `Ok(false)` on anything but a yes, including end of input.
pub(crate) fn confirm_download<R: BufRead, W: Write>(
    plan: &PagePlan,
    concurrency: usize,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    write_plan_summary(plan, concurrency, output)?;
    writeln!(output, "Would you like to proceed with the download? y/n")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

/// Runs [`confirm_download`] on the blocking pool so waiting for an answer
/// never stalls a runtime worker.
pub(crate) async fn ask_to_proceed<R, W>(
    plan: PagePlan,
    concurrency: usize,
    mut input: R,
    mut output: W,
) -> io::Result<bool>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        confirm_download(&plan, concurrency, &mut input, &mut output)
    })
    .await
    .map_err(io::Error::other)?
}

pub(crate) fn write_plan_summary<W: Write>(
    plan: &PagePlan,
    concurrency: usize,
    output: &mut W,
) -> io::Result<()> {
    writeln!(
        output,
        "Found {} results, they would be split over {} requests/files",
        plan.total_hits(),
        plan.page_count()
    )?;
    writeln!(
        output,
        "This program will run {concurrency} downloads in parallel and may use all available CPUs"
    )
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
