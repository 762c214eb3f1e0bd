use chrono::{DateTime, Duration, Utc};
use marea_shared::Route;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Trip status in the lifecycle. Scheduled trips start `Requested`; live
/// rides are materialized directly `Active` because they start on the spot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Requested,
    Accepted,
    Active,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Statuses that occupy a boat for overlap checks.
    pub fn occupies_boat(&self) -> bool {
        matches!(self, TripStatus::Accepted | TripStatus::Active)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TripStatus::Requested => "REQUESTED",
            TripStatus::Accepted => "ACCEPTED",
            TripStatus::Active => "ACTIVE",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

impl FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(TripStatus::Requested),
            "ACCEPTED" => Ok(TripStatus::Accepted),
            "ACTIVE" => Ok(TripStatus::Active),
            "COMPLETED" => Ok(TripStatus::Completed),
            "CANCELLED" => Ok(TripStatus::Cancelled),
            other => Err(format!("unknown trip status: {other}")),
        }
    }
}

/// Pricing terms frozen onto a trip when it is confirmed. Later rate-table
/// changes never touch an existing trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    pub pickup_point: String,
    pub route: Route,
    pub currency: String,
    pub hourly_rate_cents: i32,
}

impl PricingSnapshot {
    pub fn live_ride_fixed(
        pickup_point: impl Into<String>,
        route: Route,
        currency: impl Into<String>,
        hourly_rate_cents: i32,
    ) -> Self {
        Self {
            kind: "LIVE_RIDE_FIXED".to_string(),
            pickup_point: pickup_point.into(),
            route,
            currency: currency.into(),
            hourly_rate_cents,
        }
    }
}

/// A confirmed booking. Owned by no request: deleting or cancelling the
/// request that produced it must never cascade here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub boat_id: Uuid,
    pub created_by_id: Uuid,
    pub status: TripStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub passenger_count: i32,
    pub notes: Option<String>,
    pub pricing_snapshot: PricingSnapshot,
    pub subtotal_cents: i32,
    pub commission_rate: f64,
    pub commission_cents: i32,
    pub total_cents: i32,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a trip, built before the confirming transaction runs.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub boat_id: Uuid,
    pub created_by_id: Uuid,
    pub status: TripStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub passenger_count: i32,
    pub notes: Option<String>,
    pub pricing_snapshot: PricingSnapshot,
    pub subtotal_cents: i32,
    pub commission_rate: f64,
    pub commission_cents: i32,
    pub total_cents: i32,
    pub currency: String,
}

/// Everything a live-ride request needs to hand over to materialize a trip.
#[derive(Debug, Clone)]
pub struct LiveRideTerms {
    pub requester_id: Uuid,
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

impl NewTrip {
    /// Materialize an accepted live ride: starts now, runs for the requested
    /// hours, pricing copied verbatim from the request.
    pub fn for_live_ride(terms: &LiveRideTerms, boat_id: Uuid, now: DateTime<Utc>) -> Self {
        let start_at = now;
        let end_at = start_at + Duration::hours(terms.hours as i64);
        Self {
            boat_id,
            created_by_id: terms.requester_id,
            status: TripStatus::Active,
            start_at,
            end_at,
            passenger_count: terms.passenger_count,
            notes: Some(format!("Pickup: {}", terms.pickup_point)),
            pricing_snapshot: PricingSnapshot::live_ride_fixed(
                terms.pickup_point.clone(),
                terms.route,
                terms.currency.clone(),
                terms.hourly_rate_cents,
            ),
            subtotal_cents: terms.subtotal_cents,
            commission_rate: terms.commission_rate,
            commission_cents: terms.commission_cents,
            total_cents: terms.total_cents,
            currency: terms.currency.clone(),
        }
    }
}
