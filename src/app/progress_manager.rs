//! Progress UI (bar) for fetch and unpack runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use soch_download::Progress;

/// Spawns the progress UI (bar) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_bar` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_bar: bool,
    progress: Arc<Progress>,
    label: &'static str,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_bar {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_bar_inner(progress, label, Arc::clone(&stop));
    (Some(handle), stop)
}

/// Signals the UI task to stop and waits for it to clear the bar.
pub(crate) async fn stop_progress_ui(
    handle: Option<tokio::task::JoinHandle<()>>,
    stop: &AtomicBool,
) {
    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = handle {
        let _ = handle.await;
    }
}

fn spawn_bar_inner(
    progress: Arc<Progress>,
    label: &'static str,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{prefix} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(label);
        bar.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            let finished = progress.finished();
            let in_flight = progress.started().saturating_sub(finished);

            bar.set_length(progress.total());
            bar.set_position(finished);
            if progress.failed() > 0 {
                bar.set_message(format!(
                    "({in_flight} active, {} failed)",
                    progress.failed()
                ));
            } else {
                bar.set_message(format!("({in_flight} active)"));
            }
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        bar.finish_and_clear();
    })
}
