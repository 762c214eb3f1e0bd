use chrono::{DateTime, Utc};
use marea_core::DomainError;
use marea_trip::{NewTrip, Trip};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{LiveRideOffer, LiveRideRequest};
use crate::repository::{AcceptOutcome, CascadeOutcome, DispatchStore};
use crate::selector::PrioritySelector;

/// Why an open offer is being terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeReason {
    Rejected,
    Timeout,
}

impl fmt::Display for CascadeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeReason::Rejected => f.write_str("rejected"),
            CascadeReason::Timeout => f.write_str("timeout"),
        }
    }
}

/// Drives every state transition of a single offer: creation is delegated to
/// the store's transactional methods, acceptance is joint with trip
/// creation, and termination cascades to the next eligible candidate.
#[derive(Clone)]
pub struct OfferLifecycle {
    store: Arc<dyn DispatchStore>,
    selector: PrioritySelector,
}

impl OfferLifecycle {
    pub fn new(store: Arc<dyn DispatchStore>, selector: PrioritySelector) -> Self {
        Self { store, selector }
    }

    /// Terminate `offer` and hand the request to the next eligible captain,
    /// or revert it to unmatched when none remains.
    ///
    /// The exclusion set is every captain who has ever held an offer on this
    /// request, not just the one being terminated.
    pub async fn terminate_and_cascade(
        &self,
        request: &LiveRideRequest,
        offer: &LiveRideOffer,
        reason: CascadeReason,
        now: DateTime<Utc>,
    ) -> Result<CascadeOutcome, DomainError> {
        let mut exclude: HashSet<Uuid> = self
            .store
            .offered_captain_ids(request.id)
            .await?
            .into_iter()
            .collect();
        exclude.insert(offer.captain_id);

        let window = request.window_from(now);
        let next = self
            .selector
            .select_next(request.route, request.passenger_count, &window, &exclude)
            .await?;

        let outcome = self.store.cascade(offer, next.as_ref()).await?;
        match &outcome {
            CascadeOutcome::Advanced(next_offer) => {
                tracing::info!(
                    request_id = %request.id,
                    from_captain = %offer.captain_id,
                    to_captain = %next_offer.captain_id,
                    %reason,
                    "live ride offer cascaded"
                );
            }
            CascadeOutcome::Exhausted => {
                tracing::info!(
                    request_id = %request.id,
                    from_captain = %offer.captain_id,
                    %reason,
                    "live ride candidates exhausted, request unmatched"
                );
            }
            CascadeOutcome::Superseded => {
                tracing::debug!(
                    request_id = %request.id,
                    offer_id = %offer.id,
                    "cascade skipped, offer already resolved"
                );
            }
        }
        Ok(outcome)
    }

    /// Accept `offer` jointly with the creation of its trip.
    pub async fn mark_accepted(
        &self,
        request: &LiveRideRequest,
        offer: &LiveRideOffer,
        trip: &NewTrip,
    ) -> Result<Trip, DomainError> {
        match self.store.accept_with_trip(offer, trip).await? {
            AcceptOutcome::Accepted(trip) => {
                tracing::info!(
                    request_id = %request.id,
                    captain_id = %offer.captain_id,
                    trip_id = %trip.id,
                    "live ride accepted"
                );
                Ok(trip)
            }
            AcceptOutcome::Superseded => Err(DomainError::conflict(
                "Offer was already resolved by a concurrent update",
            )),
            AcceptOutcome::BoatBusy => Err(DomainError::conflict(
                "Boat is no longer available for this window",
            )),
        }
    }
}
