use marea_shared::Route;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Candidate, TimeWindow};
use crate::repository::{BoxError, CandidateSource};

/// Computes the ordered set of candidate captains for a live ride.
///
/// Exclusion rules live in the `CandidateSource` query plus the cumulative
/// `exclude` set; ordering is the source's stable creation-time order with
/// the configured priority captain promoted to the front when present.
#[derive(Clone)]
pub struct EligibilityFilter {
    source: Arc<dyn CandidateSource>,
    priority_captain_id: Option<Uuid>,
}

impl EligibilityFilter {
    pub fn new(source: Arc<dyn CandidateSource>, priority_captain_id: Option<Uuid>) -> Self {
        Self {
            source,
            priority_captain_id,
        }
    }

    /// An empty result is the normal "exhausted" signal, not an error.
    pub async fn find_candidates(
        &self,
        route: Route,
        passenger_count: i32,
        window: &TimeWindow,
        exclude: &HashSet<Uuid>,
    ) -> Result<Vec<Candidate>, BoxError> {
        let mut candidates = self
            .source
            .live_candidates(route, passenger_count, window)
            .await?;

        candidates.retain(|c| !exclude.contains(&c.captain_id));

        // Excluded priority captains get no special treatment: the retain
        // above already removed them.
        if let Some(priority) = self.priority_captain_id {
            if let Some(pos) = candidates.iter().position(|c| c.captain_id == priority) {
                if pos > 0 {
                    let promoted = candidates.remove(pos);
                    candidates.insert(0, promoted);
                }
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedSource(Vec<Candidate>);

    #[async_trait]
    impl CandidateSource for FixedSource {
        async fn live_candidates(
            &self,
            _route: Route,
            _passenger_count: i32,
            _window: &TimeWindow,
        ) -> Result<Vec<Candidate>, BoxError> {
            Ok(self.0.clone())
        }
    }

    fn candidate(captain_id: Uuid) -> Candidate {
        Candidate {
            captain_id,
            captain_user_id: Uuid::new_v4(),
            boat_id: Uuid::new_v4(),
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::starting_at(Utc::now(), 4)
    }

    #[tokio::test]
    async fn test_preserves_source_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let filter = EligibilityFilter::new(
            Arc::new(FixedSource(vec![candidate(a), candidate(b), candidate(c)])),
            None,
        );

        let out = filter
            .find_candidates(Route::Rumbo1, 2, &window(), &HashSet::new())
            .await
            .unwrap();
        let ids: Vec<Uuid> = out.iter().map(|c| c.captain_id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_excluded_captains_are_dropped() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let filter =
            EligibilityFilter::new(Arc::new(FixedSource(vec![candidate(a), candidate(b)])), None);

        let exclude: HashSet<Uuid> = [a].into_iter().collect();
        let out = filter
            .find_candidates(Route::Rumbo1, 2, &window(), &exclude)
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].captain_id, b);
    }

    #[tokio::test]
    async fn test_priority_captain_is_promoted() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let filter = EligibilityFilter::new(
            Arc::new(FixedSource(vec![candidate(a), candidate(b), candidate(c)])),
            Some(c),
        );

        let out = filter
            .find_candidates(Route::Rumbo1, 2, &window(), &HashSet::new())
            .await
            .unwrap();
        let ids: Vec<Uuid> = out.iter().map(|x| x.captain_id).collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[tokio::test]
    async fn test_excluded_priority_captain_is_not_promoted() {
        let (a, p) = (Uuid::new_v4(), Uuid::new_v4());
        let filter = EligibilityFilter::new(
            Arc::new(FixedSource(vec![candidate(a), candidate(p)])),
            Some(p),
        );

        let exclude: HashSet<Uuid> = [p].into_iter().collect();
        let out = filter
            .find_candidates(Route::Rumbo1, 2, &window(), &exclude)
            .await
            .unwrap();
        let ids: Vec<Uuid> = out.iter().map(|x| x.captain_id).collect();
        assert_eq!(ids, vec![a]);
    }

    #[tokio::test]
    async fn test_empty_result_is_normal() {
        let filter = EligibilityFilter::new(Arc::new(FixedSource(vec![])), None);
        let out = filter
            .find_candidates(Route::Rumbo3, 8, &window(), &HashSet::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
