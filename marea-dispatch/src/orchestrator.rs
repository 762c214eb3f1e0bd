use chrono::{DateTime, Duration, Utc};
use marea_catalog::pricing::{LiveRideQuote, COMMISSION_RATE};
use marea_catalog::CaptainRef;
use marea_core::{DomainError, DomainResult};
use marea_shared::Route;
use marea_trip::{NewTrip, Trip};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::eligibility::EligibilityFilter;
use crate::lifecycle::{CascadeReason, OfferLifecycle};
use crate::models::{
    offer_timeout, LiveRideOffer, LiveRideRequest, LiveRideStatus, NewLiveRideRequest, TimeWindow,
    MIN_LIVE_RIDE_HOURS,
};
use crate::repository::{CandidateSource, CascadeOutcome, DispatchStore};
use crate::selector::PrioritySelector;
use crate::sweeper::ExpirySweeper;

/// Tunables for the dispatch engine. Defaults match the platform contract:
/// 60 s offer timeout, fixed v1 pickup point, USD pricing, no priority
/// captain.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub offer_timeout: Duration,
    pub pickup_point: String,
    pub currency: String,
    pub priority_captain_id: Option<Uuid>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_timeout: offer_timeout(),
            pickup_point: "Plaza Mayor".to_string(),
            currency: "USD".to_string(),
            priority_captain_id: None,
        }
    }
}

/// Validated request body for creating a live ride.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateLiveRide {
    pub route: Route,
    pub passenger_count: i32,
    pub hours: i32,
}

/// Top-level entry points for the live-ride flow: create a request, accept
/// an offer, reject an offer. Every mutation runs the expiry sweeper first
/// and executes its own transition inside one store transaction.
#[derive(Clone)]
pub struct LiveRideDispatcher {
    store: Arc<dyn DispatchStore>,
    selector: PrioritySelector,
    lifecycle: OfferLifecycle,
    sweeper: ExpirySweeper,
    config: DispatchConfig,
}

impl LiveRideDispatcher {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        candidates: Arc<dyn CandidateSource>,
        config: DispatchConfig,
    ) -> Self {
        let filter = EligibilityFilter::new(candidates, config.priority_captain_id);
        let selector = PrioritySelector::new(filter);
        let lifecycle = OfferLifecycle::new(store.clone(), selector.clone());
        let sweeper = ExpirySweeper::new(store.clone(), lifecycle.clone(), config.offer_timeout);
        Self {
            store,
            selector,
            lifecycle,
            sweeper,
            config,
        }
    }

    /// Create a request and offer it to the first eligible captain.
    ///
    /// Fails with a conflict when no captain is eligible: an expected
    /// outcome, not a system fault.
    pub async fn create_request(
        &self,
        requester_id: Uuid,
        input: &CreateLiveRide,
    ) -> DomainResult<LiveRideRequest> {
        if input.passenger_count < 1 {
            return Err(DomainError::validation("passengerCount must be >= 1"));
        }
        if input.hours < MIN_LIVE_RIDE_HOURS {
            return Err(DomainError::validation(format!(
                "hours must be >= {MIN_LIVE_RIDE_HOURS}"
            )));
        }

        let now = Utc::now();
        self.sweep_best_effort(now).await;

        let window = TimeWindow::starting_at(now, input.hours);
        let candidate = self
            .selector
            .select_next(input.route, input.passenger_count, &window, &HashSet::new())
            .await?
            .ok_or_else(|| {
                DomainError::conflict("No captains available for live rides right now")
            })?;

        let quote = LiveRideQuote::for_ride(input.route, input.hours);
        let new_request = NewLiveRideRequest {
            created_by_id: requester_id,
            pickup_point: self.config.pickup_point.clone(),
            route: input.route,
            passenger_count: input.passenger_count,
            hours: input.hours,
            hourly_rate_cents: quote.hourly_rate_cents,
            subtotal_cents: quote.subtotal_cents,
            commission_rate: COMMISSION_RATE,
            commission_cents: quote.commission_cents,
            total_cents: quote.total_cents,
            currency: self.config.currency.clone(),
        };

        let created = self
            .store
            .create_request_with_offer(&new_request, &candidate)
            .await?;
        tracing::info!(
            request_id = %created.id,
            captain_id = %candidate.captain_id,
            route = %created.route,
            "live ride requested and offered"
        );
        Ok(created)
    }

    /// Accept the current offer: materializes the trip (status `ACTIVE`,
    /// window starting now) and resolves the request in one transaction.
    pub async fn accept_offer(&self, request_id: Uuid, captain: &CaptainRef) -> DomainResult<Trip> {
        let now = Utc::now();
        self.sweep_best_effort(now).await;

        let (request, offer) = self.current_offer_guard(request_id, captain.id).await?;
        let trip = NewTrip::for_live_ride(&request.terms(), offer.boat_id, now);
        self.lifecycle.mark_accepted(&request, &offer, &trip).await
    }

    /// Reject the current offer and cascade to the next eligible captain.
    pub async fn reject_offer(&self, request_id: Uuid, captain: &CaptainRef) -> DomainResult<()> {
        let now = Utc::now();
        self.sweep_best_effort(now).await;

        let (request, offer) = self.current_offer_guard(request_id, captain.id).await?;
        match self
            .lifecycle
            .terminate_and_cascade(&request, &offer, CascadeReason::Rejected, now)
            .await?
        {
            CascadeOutcome::Superseded => Err(DomainError::conflict(
                "Offer was already resolved by a concurrent update",
            )),
            _ => Ok(()),
        }
    }

    /// Run one expiry sweep. Exposed for the background worker and the
    /// notification polling path.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        self.sweeper.sweep_expired(now).await
    }

    /// Guard checks shared by accept and reject: the request must exist, be
    /// currently offered, be offered to the acting captain, and the
    /// captain's latest offer must still be open.
    async fn current_offer_guard(
        &self,
        request_id: Uuid,
        captain_id: Uuid,
    ) -> DomainResult<(LiveRideRequest, LiveRideOffer)> {
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Live ride not found"))?;

        if request.status != LiveRideStatus::Offered {
            return Err(DomainError::validation("Live ride is not currently offered"));
        }
        if request.offered_to_captain_id != Some(captain_id) {
            return Err(DomainError::forbidden("Not offered to you"));
        }

        let offer = self
            .store
            .latest_offer_for_captain(request_id, captain_id)
            .await?
            .filter(|offer| offer.is_open())
            .ok_or_else(|| DomainError::forbidden("No active offer"))?;

        Ok((request, offer))
    }

    /// Sweep errors are isolated from the primary operation: logged, never
    /// re-thrown into the response path.
    async fn sweep_best_effort(&self, now: DateTime<Utc>) {
        if let Err(err) = self.sweeper.sweep_expired(now).await {
            tracing::warn!(error = %err, "expiry sweep failed, continuing primary operation");
        }
    }
}
