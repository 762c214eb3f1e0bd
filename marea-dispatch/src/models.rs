use chrono::{DateTime, Duration, Utc};
use marea_shared::Route;
use marea_trip::LiveRideTerms;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How long a captain holds an offer before the sweeper reclaims it.
pub const OFFER_TIMEOUT_MS: i64 = 60_000;

/// The offer timeout as a `chrono` duration.
pub fn offer_timeout() -> Duration {
    Duration::milliseconds(OFFER_TIMEOUT_MS)
}

/// Minimum bookable live-ride duration, in hours.
pub const MIN_LIVE_RIDE_HOURS: i32 = 4;

/// Live-ride request status.
///
/// `Requested` doubles as the unmatched fallback: a request whose candidates
/// are exhausted reverts here with no offered captain. There is no terminal
/// rejected status for the request itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveRideStatus {
    Requested,
    Offered,
    Accepted,
}

impl fmt::Display for LiveRideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LiveRideStatus::Requested => "REQUESTED",
            LiveRideStatus::Offered => "OFFERED",
            LiveRideStatus::Accepted => "ACCEPTED",
        };
        f.write_str(s)
    }
}

impl FromStr for LiveRideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(LiveRideStatus::Requested),
            "OFFERED" => Ok(LiveRideStatus::Offered),
            "ACCEPTED" => Ok(LiveRideStatus::Accepted),
            other => Err(format!("unknown live ride status: {other}")),
        }
    }
}

/// Offer status. Terminal offers are never mutated again; expiry rejects the
/// old offer and creates a fresh one for the next candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveRideOfferStatus {
    Offered,
    Accepted,
    Rejected,
}

impl fmt::Display for LiveRideOfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LiveRideOfferStatus::Offered => "OFFERED",
            LiveRideOfferStatus::Accepted => "ACCEPTED",
            LiveRideOfferStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

impl FromStr for LiveRideOfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFFERED" => Ok(LiveRideOfferStatus::Offered),
            "ACCEPTED" => Ok(LiveRideOfferStatus::Accepted),
            "REJECTED" => Ok(LiveRideOfferStatus::Rejected),
            other => Err(format!("unknown offer status: {other}")),
        }
    }
}

/// One passenger-initiated ask.
///
/// Invariants: `offered_to_captain_id` is set iff status is `Offered`;
/// `trip_id` is set iff status is `Accepted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRideRequest {
    pub id: Uuid,
    pub created_by_id: Uuid,
    pub pickup_point: String,
    pub route: Route,
    pub passenger_count: i32,
    pub hours: i32,
    pub hourly_rate_cents: i32,
    pub subtotal_cents: i32,
    pub commission_rate: f64,
    pub commission_cents: i32,
    pub total_cents: i32,
    pub currency: String,
    pub status: LiveRideStatus,
    pub offered_to_captain_id: Option<Uuid>,
    pub trip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LiveRideRequest {
    /// The service window a candidate boat must be free for, anchored at
    /// `now` because live rides always start on the spot.
    pub fn window_from(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::starting_at(now, self.hours)
    }

    /// Hand-off payload for trip materialization on accept.
    pub fn terms(&self) -> LiveRideTerms {
        LiveRideTerms {
            requester_id: self.created_by_id,
            pickup_point: self.pickup_point.clone(),
            route: self.route,
            passenger_count: self.passenger_count,
            hours: self.hours,
            hourly_rate_cents: self.hourly_rate_cents,
            subtotal_cents: self.subtotal_cents,
            commission_rate: self.commission_rate,
            commission_cents: self.commission_cents,
            total_cents: self.total_cents,
            currency: self.currency.clone(),
        }
    }
}

/// One captain's turn at a request. At most one `Offered` row exists per
/// request at any time; the full history is retained to exclude
/// previously-tried captains from re-selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRideOffer {
    pub id: Uuid,
    pub request_id: Uuid,
    pub captain_id: Uuid,
    pub boat_id: Uuid,
    pub status: LiveRideOfferStatus,
    pub created_at: DateTime<Utc>,
}

impl LiveRideOffer {
    pub fn is_open(&self) -> bool {
        self.status == LiveRideOfferStatus::Offered
    }
}

/// A half-open service window `[start_at, end_at)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl TimeWindow {
    pub fn starting_at(start_at: DateTime<Utc>, hours: i32) -> Self {
        Self {
            start_at,
            end_at: start_at + Duration::hours(hours as i64),
        }
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start_at < other.end_at && self.end_at > other.start_at
    }
}

/// An eligible captain/boat pair. Each captain is a single slot regardless of
/// fleet size; `boat_id` is their earliest-created eligible boat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub captain_id: Uuid,
    pub captain_user_id: Uuid,
    pub boat_id: Uuid,
}

/// Insert payload for a live-ride request, priced and validated upstream.
#[derive(Debug, Clone)]
pub struct NewLiveRideRequest {
    pub created_by_id: Uuid,
    pub pickup_point: String,
    pub route: Route,
    pub passenger_count: i32,
    pub hours: i32,
    pub hourly_rate_cents: i32,
    pub subtotal_cents: i32,
    pub commission_rate: f64,
    pub commission_cents: i32,
    pub total_cents: i32,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips() {
        for s in [
            LiveRideStatus::Requested,
            LiveRideStatus::Offered,
            LiveRideStatus::Accepted,
        ] {
            assert_eq!(s.to_string().parse::<LiveRideStatus>().unwrap(), s);
        }
        for s in [
            LiveRideOfferStatus::Offered,
            LiveRideOfferStatus::Accepted,
            LiveRideOfferStatus::Rejected,
        ] {
            assert_eq!(s.to_string().parse::<LiveRideOfferStatus>().unwrap(), s);
        }
    }

    #[test]
    fn test_window_overlap() {
        let now = Utc::now();
        let a = TimeWindow::starting_at(now, 4);
        let b = TimeWindow::starting_at(now + Duration::hours(3), 4);
        let c = TimeWindow::starting_at(now + Duration::hours(4), 4);

        assert!(a.overlaps(&b));
        // half-open: back-to-back windows do not overlap
        assert!(!a.overlaps(&c));
    }
}
