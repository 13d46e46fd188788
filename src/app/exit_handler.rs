//! Exit code logic for the soch-download process.
//!
//! Single responsibility: map page outcomes to the process exit outcome.

use crate::ProcessExit;

/// Determines the process exit outcome from fetched and incomplete page counts.
pub(crate) fn determine_exit_outcome(fetched: usize, incomplete: usize) -> ProcessExit {
    if incomplete == 0 {
        ProcessExit::Success
    } else if fetched > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
