//! In-memory store used by the engine and API test suites. Mirrors the
//! guarded-transaction semantics of the Postgres implementation, including
//! the boat/window overlap guard on accept.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marea_catalog::{CaptainDirectory, CaptainRef};
use marea_shared::models::{Notification, NotificationKind};
use marea_shared::Route;
use marea_trip::{NewTrip, Trip};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    Candidate, LiveRideOffer, LiveRideOfferStatus, LiveRideRequest, LiveRideStatus,
    NewLiveRideRequest, TimeWindow,
};
use crate::repository::{
    AcceptOutcome, BoxError, CandidateSource, CascadeOutcome, DispatchStore, NotificationStore,
};

/// A captain with one live-ride boat, as the directory would project them.
#[derive(Debug, Clone)]
pub struct CaptainFixture {
    pub captain_id: Uuid,
    pub user_id: Uuid,
    pub boat_id: Uuid,
    pub max_passengers: i32,
    pub routes: Vec<Route>,
    pub live_rides_on: bool,
    pub created_at: DateTime<Utc>,
}

impl CaptainFixture {
    pub fn new(max_passengers: i32, routes: Vec<Route>, created_at: DateTime<Utc>) -> Self {
        Self {
            captain_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            boat_id: Uuid::new_v4(),
            max_passengers,
            routes,
            live_rides_on: true,
            created_at,
        }
    }
}

#[derive(Default)]
struct State {
    captains: Vec<CaptainFixture>,
    requests: HashMap<Uuid, LiveRideRequest>,
    offers: Vec<LiveRideOffer>,
    trips: Vec<Trip>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct InMemoryDispatch {
    state: Mutex<State>,
}

impl InMemoryDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("dispatch test store lock poisoned")
    }

    pub fn add_captain(&self, fixture: CaptainFixture) {
        self.state().captains.push(fixture);
    }

    /// Rewind an offer's creation time to exercise expiry.
    pub fn backdate_offer(&self, offer_id: Uuid, created_at: DateTime<Utc>) {
        let mut state = self.state();
        if let Some(offer) = state.offers.iter_mut().find(|o| o.id == offer_id) {
            offer.created_at = created_at;
        }
    }

    /// Seed an existing trip, e.g. to make a boat busy.
    pub fn add_trip(&self, trip: Trip) {
        self.state().trips.push(trip);
    }

    pub fn request(&self, id: Uuid) -> Option<LiveRideRequest> {
        self.state().requests.get(&id).cloned()
    }

    pub fn offers_for(&self, request_id: Uuid) -> Vec<LiveRideOffer> {
        self.state()
            .offers
            .iter()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect()
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn trips(&self) -> Vec<Trip> {
        self.state().trips.clone()
    }
}

fn boat_busy(state: &State, boat_id: Uuid, window: &TimeWindow) -> bool {
    state.trips.iter().any(|t| {
        t.boat_id == boat_id
            && t.status.occupies_boat()
            && TimeWindow {
                start_at: t.start_at,
                end_at: t.end_at,
            }
            .overlaps(window)
    })
}

fn notification_for(candidate: &Candidate, request_id: Uuid, now: DateTime<Utc>) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id: candidate.captain_user_id,
        kind: NotificationKind::LiveRideOffer,
        live_ride_request_id: Some(request_id),
        read_at: None,
        created_at: now,
    }
}

fn open_offer_for(candidate: &Candidate, request_id: Uuid, now: DateTime<Utc>) -> LiveRideOffer {
    LiveRideOffer {
        id: Uuid::new_v4(),
        request_id,
        captain_id: candidate.captain_id,
        boat_id: candidate.boat_id,
        status: LiveRideOfferStatus::Offered,
        created_at: now,
    }
}

#[async_trait]
impl CandidateSource for InMemoryDispatch {
    async fn live_candidates(
        &self,
        route: Route,
        passenger_count: i32,
        window: &TimeWindow,
    ) -> Result<Vec<Candidate>, BoxError> {
        let state = self.state();
        let mut eligible: Vec<&CaptainFixture> = state
            .captains
            .iter()
            .filter(|c| {
                c.live_rides_on
                    && c.max_passengers >= passenger_count
                    && c.routes.contains(&route)
                    && !boat_busy(&state, c.boat_id, window)
            })
            .collect();
        eligible.sort_by_key(|c| (c.created_at, c.captain_id));

        Ok(eligible
            .into_iter()
            .map(|c| Candidate {
                captain_id: c.captain_id,
                captain_user_id: c.user_id,
                boat_id: c.boat_id,
            })
            .collect())
    }
}

#[async_trait]
impl CaptainDirectory for InMemoryDispatch {
    async fn captain_for_user(&self, user_id: Uuid) -> Result<Option<CaptainRef>, BoxError> {
        Ok(self
            .state()
            .captains
            .iter()
            .find(|c| c.user_id == user_id)
            .map(|c| CaptainRef {
                id: c.captain_id,
                user_id: c.user_id,
            }))
    }
}

#[async_trait]
impl DispatchStore for InMemoryDispatch {
    async fn create_request_with_offer(
        &self,
        request: &NewLiveRideRequest,
        candidate: &Candidate,
    ) -> Result<LiveRideRequest, BoxError> {
        let now = Utc::now();
        let created = LiveRideRequest {
            id: Uuid::new_v4(),
            created_by_id: request.created_by_id,
            pickup_point: request.pickup_point.clone(),
            route: request.route,
            passenger_count: request.passenger_count,
            hours: request.hours,
            hourly_rate_cents: request.hourly_rate_cents,
            subtotal_cents: request.subtotal_cents,
            commission_rate: request.commission_rate,
            commission_cents: request.commission_cents,
            total_cents: request.total_cents,
            currency: request.currency.clone(),
            status: LiveRideStatus::Offered,
            offered_to_captain_id: Some(candidate.captain_id),
            trip_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state();
        state.offers.push(open_offer_for(candidate, created.id, now));
        state
            .notifications
            .push(notification_for(candidate, created.id, now));
        state.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<LiveRideRequest>, BoxError> {
        Ok(self.state().requests.get(&id).cloned())
    }

    async fn latest_offer_for_captain(
        &self,
        request_id: Uuid,
        captain_id: Uuid,
    ) -> Result<Option<LiveRideOffer>, BoxError> {
        Ok(self
            .state()
            .offers
            .iter()
            .rev()
            .find(|o| o.request_id == request_id && o.captain_id == captain_id)
            .cloned())
    }

    async fn offered_captain_ids(&self, request_id: Uuid) -> Result<Vec<Uuid>, BoxError> {
        let state = self.state();
        let mut seen = Vec::new();
        for offer in state.offers.iter().filter(|o| o.request_id == request_id) {
            if !seen.contains(&offer.captain_id) {
                seen.push(offer.captain_id);
            }
        }
        Ok(seen)
    }

    async fn open_offers_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LiveRideOffer>, BoxError> {
        let mut stale: Vec<LiveRideOffer> = self
            .state()
            .offers
            .iter()
            .filter(|o| o.status == LiveRideOfferStatus::Offered && o.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|o| o.created_at);
        Ok(stale)
    }

    async fn cascade(
        &self,
        offer: &LiveRideOffer,
        next: Option<&Candidate>,
    ) -> Result<CascadeOutcome, BoxError> {
        let now = Utc::now();
        let mut state = self.state();

        let still_open = state
            .offers
            .iter()
            .any(|o| o.id == offer.id && o.status == LiveRideOfferStatus::Offered);
        let request_current = state
            .requests
            .get(&offer.request_id)
            .map(|r| {
                r.status == LiveRideStatus::Offered
                    && r.offered_to_captain_id == Some(offer.captain_id)
            })
            .unwrap_or(false);
        if !still_open || !request_current {
            return Ok(CascadeOutcome::Superseded);
        }

        if let Some(stored) = state.offers.iter_mut().find(|o| o.id == offer.id) {
            stored.status = LiveRideOfferStatus::Rejected;
        }

        match next {
            Some(candidate) => {
                let next_offer = open_offer_for(candidate, offer.request_id, now);
                state.offers.push(next_offer.clone());
                state
                    .notifications
                    .push(notification_for(candidate, offer.request_id, now));
                if let Some(request) = state.requests.get_mut(&offer.request_id) {
                    request.status = LiveRideStatus::Offered;
                    request.offered_to_captain_id = Some(candidate.captain_id);
                    request.updated_at = now;
                }
                Ok(CascadeOutcome::Advanced(next_offer))
            }
            None => {
                if let Some(request) = state.requests.get_mut(&offer.request_id) {
                    request.status = LiveRideStatus::Requested;
                    request.offered_to_captain_id = None;
                    request.updated_at = now;
                }
                Ok(CascadeOutcome::Exhausted)
            }
        }
    }

    async fn accept_with_trip(
        &self,
        offer: &LiveRideOffer,
        trip: &NewTrip,
    ) -> Result<AcceptOutcome, BoxError> {
        let now = Utc::now();
        let mut state = self.state();

        let still_open = state
            .offers
            .iter()
            .any(|o| o.id == offer.id && o.status == LiveRideOfferStatus::Offered);
        let request_current = state
            .requests
            .get(&offer.request_id)
            .map(|r| {
                r.status == LiveRideStatus::Offered
                    && r.offered_to_captain_id == Some(offer.captain_id)
            })
            .unwrap_or(false);
        if !still_open || !request_current {
            return Ok(AcceptOutcome::Superseded);
        }

        let window = TimeWindow {
            start_at: trip.start_at,
            end_at: trip.end_at,
        };
        if boat_busy(&state, trip.boat_id, &window) {
            return Ok(AcceptOutcome::BoatBusy);
        }

        let created = Trip {
            id: Uuid::new_v4(),
            boat_id: trip.boat_id,
            created_by_id: trip.created_by_id,
            status: trip.status,
            start_at: trip.start_at,
            end_at: trip.end_at,
            passenger_count: trip.passenger_count,
            notes: trip.notes.clone(),
            pricing_snapshot: trip.pricing_snapshot.clone(),
            subtotal_cents: trip.subtotal_cents,
            commission_rate: trip.commission_rate,
            commission_cents: trip.commission_cents,
            total_cents: trip.total_cents,
            currency: trip.currency.clone(),
            created_at: now,
        };
        state.trips.push(created.clone());

        if let Some(stored) = state.offers.iter_mut().find(|o| o.id == offer.id) {
            stored.status = LiveRideOfferStatus::Accepted;
        }
        if let Some(request) = state.requests.get_mut(&offer.request_id) {
            request.status = LiveRideStatus::Accepted;
            request.offered_to_captain_id = None;
            request.trip_id = Some(created.id);
            request.updated_at = now;
        }

        Ok(AcceptOutcome::Accepted(created))
    }
}

#[async_trait]
impl NotificationStore for InMemoryDispatch {
    async fn unread_count(&self, user_id: Uuid) -> Result<i64, BoxError> {
        Ok(self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && n.is_unread())
            .count() as i64)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, BoxError> {
        let mut rows: Vec<Notification> = self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || n.is_unread()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, BoxError> {
        Ok(self.state().notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), BoxError> {
        let mut state = self.state();
        if let Some(n) = state.notifications.iter_mut().find(|n| n.id == id) {
            if n.read_at.is_none() {
                n.read_at = Some(at);
            }
        }
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BoxError> {
        let mut state = self.state();
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
        {
            n.read_at = Some(at);
        }
        Ok(())
    }
}
