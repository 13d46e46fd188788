//! Query planning: hit-count discovery and page plan computation.
//!
//! The planner probes the service once for the total number of matching
//! records and turns it into a [`PagePlan`] of fixed-size pages. The plan
//! yields one [`PageRequest`] per page; each request's `start_offset` is
//! unique within the plan and doubles as the page file name.

use tracing::{info, instrument};

use crate::api::{ApiError, PAGE_SIZE, SearchClient};

/// Errors produced while planning a download.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The probe request failed.
    #[error(transparent)]
    Remote(#[from] ApiError),

    /// The predicate matched no records, so there is nothing to download.
    #[error("SOCH returned zero records for query `{predicate}`")]
    EmptyResult {
        /// The predicate that matched nothing.
        predicate: String,
    },
}

/// The set of pages needed to cover every record matching a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    predicate: String,
    page_size: u64,
    total_hits: u64,
    page_count: u64,
}

impl PagePlan {
    /// Builds a plan for `total_hits` records split into `page_size` pages.
    ///
    /// Returns `None` when there is nothing to fetch (`total_hits == 0`) or
    /// the page size is zero.
    #[must_use]
    pub fn new(predicate: impl Into<String>, total_hits: u64, page_size: u64) -> Option<Self> {
        if total_hits == 0 || page_size == 0 {
            return None;
        }
        Some(Self {
            predicate: predicate.into(),
            page_size,
            total_hits,
            page_count: page_count(total_hits, page_size),
        })
    }

    /// The search predicate every page request carries.
    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Records per page.
    #[must_use]
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Total records reported by the probe.
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// Number of page requests in the plan.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Offsets of every page in the plan, in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.page_count).map(move |index| index * self.page_size)
    }

    /// Every page request of the plan, in ascending offset order.
    pub fn requests(&self) -> impl Iterator<Item = PageRequest> + '_ {
        self.offsets().map(move |start_offset| PageRequest {
            predicate: self.predicate.clone(),
            page_size: self.page_size,
            start_offset,
        })
    }
}

/// One page of a plan: a single HTTP request and a single page file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// The search predicate.
    pub predicate: String,
    /// Records requested.
    pub page_size: u64,
    /// Index of the first record of this page within the full result set.
    pub start_offset: u64,
}

/// Pages needed to hold `total_hits` records: `ceil(total_hits / page_size)`.
///
/// `page_size` must be non-zero.
#[must_use]
pub fn page_count(total_hits: u64, page_size: u64) -> u64 {
    total_hits.div_ceil(page_size)
}

/// Computes download plans by probing the search API.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    client: SearchClient,
    page_size: u64,
}

impl QueryPlanner {
    /// Creates a planner using the service's fixed page size.
    #[must_use]
    pub fn new(client: SearchClient) -> Self {
        Self {
            client,
            page_size: PAGE_SIZE,
        }
    }

    /// Probes the service and returns the plan for `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Remote`] when the probe fails and
    /// [`PlanError::EmptyResult`] when nothing matches.
    #[instrument(skip(self))]
    pub async fn plan(&self, predicate: &str) -> Result<PagePlan, PlanError> {
        let total_hits = self.client.total_hits(predicate).await?;
        let plan = PagePlan::new(predicate, total_hits, self.page_size).ok_or_else(|| {
            PlanError::EmptyResult {
                predicate: predicate.to_string(),
            }
        })?;

        info!(
            total_hits,
            page_count = plan.page_count(),
            page_size = plan.page_size(),
            "computed page plan"
        );
        Ok(plan)
    }
}
