use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marea_shared::models::Notification;
use marea_shared::Route;
use marea_trip::{NewTrip, Trip};
use uuid::Uuid;

use crate::models::{Candidate, LiveRideOffer, LiveRideRequest, NewLiveRideRequest, TimeWindow};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of terminating an offer and cascading to the next candidate.
#[derive(Debug)]
pub enum CascadeOutcome {
    /// The next candidate now holds a fresh offer.
    Advanced(LiveRideOffer),
    /// No candidate left; the request reverted to `REQUESTED` with no
    /// offered captain.
    Exhausted,
    /// The precondition failed: a concurrent accept/reject/expiry already
    /// resolved this offer. Nothing was written.
    Superseded,
}

/// Result of the accept transaction.
#[derive(Debug)]
pub enum AcceptOutcome {
    /// Offer accepted; the trip exists and the request points at it.
    Accepted(Trip),
    /// A concurrent transition already resolved the offer. Nothing was
    /// written.
    Superseded,
    /// The storage-layer overlap guard fired: another trip claimed this boat
    /// and window first. Nothing was written.
    BoatBusy,
}

/// Read-only candidate discovery over the captain/boat directory.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Every captain able to serve a live ride on `route` for
    /// `passenger_count` passengers over `window`, each paired with their
    /// earliest-created eligible boat, ordered by captain creation time
    /// ascending then captain id ascending.
    ///
    /// Eligibility: live rides enabled, capacity, active pricing for the
    /// route, and no trip in an occupying status overlapping the window.
    async fn live_candidates(
        &self,
        route: Route,
        passenger_count: i32,
        window: &TimeWindow,
    ) -> Result<Vec<Candidate>, BoxError>;
}

/// Transactional storage for the live-ride lifecycle. Every mutating method
/// is a single atomic transaction; guarded methods verify their precondition
/// inside the transaction and report supersession instead of writing.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Insert the request (status `OFFERED`), its first offer, and the
    /// captain's notification in one transaction.
    async fn create_request_with_offer(
        &self,
        request: &NewLiveRideRequest,
        candidate: &Candidate,
    ) -> Result<LiveRideRequest, BoxError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<LiveRideRequest>, BoxError>;

    /// The captain's most recent offer on the request, terminal or not.
    async fn latest_offer_for_captain(
        &self,
        request_id: Uuid,
        captain_id: Uuid,
    ) -> Result<Option<LiveRideOffer>, BoxError>;

    /// Every captain who has ever held an offer on the request.
    async fn offered_captain_ids(&self, request_id: Uuid) -> Result<Vec<Uuid>, BoxError>;

    /// Open offers created before `cutoff`, oldest first.
    async fn open_offers_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LiveRideOffer>, BoxError>;

    /// Terminate `offer` (status `REJECTED`) and either hand the request to
    /// `next` (fresh offer + notification) or revert it to `REQUESTED`, all
    /// in one transaction. Precondition: `offer` is still open and still the
    /// request's current offer.
    async fn cascade(
        &self,
        offer: &LiveRideOffer,
        next: Option<&Candidate>,
    ) -> Result<CascadeOutcome, BoxError>;

    /// Accept `offer`: insert `trip`, mark the offer `ACCEPTED`, and mark the
    /// request `ACCEPTED` with `trip_id` set, all in one transaction. Same
    /// precondition as [`DispatchStore::cascade`]. An offer is never accepted
    /// without its trip existing.
    async fn accept_with_trip(
        &self,
        offer: &LiveRideOffer,
        trip: &NewTrip,
    ) -> Result<AcceptOutcome, BoxError>;
}

/// Notification inbox operations.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn unread_count(&self, user_id: Uuid) -> Result<i64, BoxError>;

    /// Newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, BoxError>;

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), BoxError>;

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BoxError>;
}
