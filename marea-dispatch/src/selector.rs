use marea_shared::Route;
use std::collections::HashSet;
use uuid::Uuid;

use crate::eligibility::EligibilityFilter;
use crate::models::{Candidate, TimeWindow};
use crate::repository::BoxError;

/// Picks exactly one captain to offer next.
///
/// A thin policy seam over the eligibility filter: selection strategy (e.g.
/// future weighting by rating or proximity) can change here without touching
/// the filter's exclusion rules.
#[derive(Clone)]
pub struct PrioritySelector {
    filter: EligibilityFilter,
}

impl PrioritySelector {
    pub fn new(filter: EligibilityFilter) -> Self {
        Self { filter }
    }

    /// The head of the ordered candidate list, or `None` when exhausted.
    pub async fn select_next(
        &self,
        route: Route,
        passenger_count: i32,
        window: &TimeWindow,
        exclude: &HashSet<Uuid>,
    ) -> Result<Option<Candidate>, BoxError> {
        let candidates = self
            .filter
            .find_candidates(route, passenger_count, window, exclude)
            .await?;
        Ok(candidates.into_iter().next())
    }
}
