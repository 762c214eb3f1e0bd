use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marea_dispatch::models::NewLiveRideRequest;
use marea_dispatch::repository::{
    AcceptOutcome, BoxError, CascadeOutcome, DispatchStore,
};
use marea_dispatch::{
    Candidate, LiveRideOffer, LiveRideOfferStatus, LiveRideRequest, LiveRideStatus,
};
use marea_shared::models::NotificationKind;
use marea_shared::Route;
use marea_trip::{NewTrip, Trip};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Postgres-backed dispatch store. Every mutating method runs as one
/// transaction; guards are conditional `UPDATE … WHERE status = 'OFFERED'`
/// statements checked via `rows_affected`, so a superseded precondition
/// rolls back cleanly instead of overwriting a concurrent transition.
pub struct PostgresDispatchStore {
    pool: PgPool,
}

impl PostgresDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LiveRideRequestRow {
    id: Uuid,
    created_by_id: Uuid,
    pickup_point: String,
    route: String,
    passenger_count: i32,
    hours: i32,
    hourly_rate_cents: i32,
    subtotal_cents: i32,
    commission_rate: f64,
    commission_cents: i32,
    total_cents: i32,
    currency: String,
    status: String,
    offered_to_captain_id: Option<Uuid>,
    trip_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LiveRideRequestRow {
    fn into_model(self) -> Result<LiveRideRequest, BoxError> {
        Ok(LiveRideRequest {
            id: self.id,
            created_by_id: self.created_by_id,
            pickup_point: self.pickup_point,
            route: self.route.parse::<Route>()?,
            passenger_count: self.passenger_count,
            hours: self.hours,
            hourly_rate_cents: self.hourly_rate_cents,
            subtotal_cents: self.subtotal_cents,
            commission_rate: self.commission_rate,
            commission_cents: self.commission_cents,
            total_cents: self.total_cents,
            currency: self.currency,
            status: self.status.parse::<LiveRideStatus>()?,
            offered_to_captain_id: self.offered_to_captain_id,
            trip_id: self.trip_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LiveRideOfferRow {
    id: Uuid,
    request_id: Uuid,
    captain_id: Uuid,
    boat_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl LiveRideOfferRow {
    fn into_model(self) -> Result<LiveRideOffer, BoxError> {
        Ok(LiveRideOffer {
            id: self.id,
            request_id: self.request_id,
            captain_id: self.captain_id,
            boat_id: self.boat_id,
            status: self.status.parse::<LiveRideOfferStatus>()?,
            created_at: self.created_at,
        })
    }
}

const REQUEST_COLUMNS: &str = "id, created_by_id, pickup_point, route, passenger_count, hours, \
     hourly_rate_cents, subtotal_cents, commission_rate, commission_cents, total_cents, currency, \
     status, offered_to_captain_id, trip_id, created_at, updated_at";

async fn insert_offer(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    candidate: &Candidate,
    now: DateTime<Utc>,
) -> Result<LiveRideOffer, BoxError> {
    let offer = LiveRideOffer {
        id: Uuid::new_v4(),
        request_id,
        captain_id: candidate.captain_id,
        boat_id: candidate.boat_id,
        status: LiveRideOfferStatus::Offered,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO live_ride_offers (id, request_id, captain_id, boat_id, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(offer.id)
    .bind(offer.request_id)
    .bind(offer.captain_id)
    .bind(offer.boat_id)
    .bind(offer.status.to_string())
    .bind(offer.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(offer)
}

async fn insert_offer_notification(
    tx: &mut Transaction<'_, Postgres>,
    candidate: &Candidate,
    request_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), BoxError> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, live_ride_request_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(candidate.captain_user_id)
    .bind(NotificationKind::LiveRideOffer.to_string())
    .bind(request_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl DispatchStore for PostgresDispatchStore {
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

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO live_ride_requests
                (id, created_by_id, pickup_point, route, passenger_count, hours,
                 hourly_rate_cents, subtotal_cents, commission_rate, commission_cents,
                 total_cents, currency, status, offered_to_captain_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(created.id)
        .bind(created.created_by_id)
        .bind(&created.pickup_point)
        .bind(created.route.as_str())
        .bind(created.passenger_count)
        .bind(created.hours)
        .bind(created.hourly_rate_cents)
        .bind(created.subtotal_cents)
        .bind(created.commission_rate)
        .bind(created.commission_cents)
        .bind(created.total_cents)
        .bind(&created.currency)
        .bind(created.status.to_string())
        .bind(created.offered_to_captain_id)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_offer(&mut tx, created.id, candidate, now).await?;
        insert_offer_notification(&mut tx, candidate, created.id, now).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<LiveRideRequest>, BoxError> {
        let row = sqlx::query_as::<_, LiveRideRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM live_ride_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LiveRideRequestRow::into_model).transpose()
    }

    async fn latest_offer_for_captain(
        &self,
        request_id: Uuid,
        captain_id: Uuid,
    ) -> Result<Option<LiveRideOffer>, BoxError> {
        let row = sqlx::query_as::<_, LiveRideOfferRow>(
            r#"
            SELECT id, request_id, captain_id, boat_id, status, created_at
            FROM live_ride_offers
            WHERE request_id = $1 AND captain_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(request_id)
        .bind(captain_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LiveRideOfferRow::into_model).transpose()
    }

    async fn offered_captain_ids(&self, request_id: Uuid) -> Result<Vec<Uuid>, BoxError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT DISTINCT captain_id FROM live_ride_offers WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn open_offers_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LiveRideOffer>, BoxError> {
        let rows = sqlx::query_as::<_, LiveRideOfferRow>(
            r#"
            SELECT id, request_id, captain_id, boat_id, status, created_at
            FROM live_ride_offers
            WHERE status = 'OFFERED' AND created_at < $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LiveRideOfferRow::into_model).collect()
    }

    async fn cascade(
        &self,
        offer: &LiveRideOffer,
        next: Option<&Candidate>,
    ) -> Result<CascadeOutcome, BoxError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let terminated = sqlx::query(
            "UPDATE live_ride_offers SET status = 'REJECTED' WHERE id = $1 AND status = 'OFFERED'",
        )
        .bind(offer.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if terminated == 0 {
            tx.rollback().await?;
            return Ok(CascadeOutcome::Superseded);
        }

        let outcome = match next {
            Some(candidate) => {
                let advanced = sqlx::query(
                    r#"
                    UPDATE live_ride_requests
                    SET offered_to_captain_id = $1, updated_at = $2
                    WHERE id = $3 AND status = 'OFFERED' AND offered_to_captain_id = $4
                    "#,
                )
                .bind(candidate.captain_id)
                .bind(now)
                .bind(offer.request_id)
                .bind(offer.captain_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if advanced == 0 {
                    tx.rollback().await?;
                    return Ok(CascadeOutcome::Superseded);
                }

                let next_offer = insert_offer(&mut tx, offer.request_id, candidate, now).await?;
                insert_offer_notification(&mut tx, candidate, offer.request_id, now).await?;
                CascadeOutcome::Advanced(next_offer)
            }
            None => {
                let reverted = sqlx::query(
                    r#"
                    UPDATE live_ride_requests
                    SET status = 'REQUESTED', offered_to_captain_id = NULL, updated_at = $1
                    WHERE id = $2 AND status = 'OFFERED' AND offered_to_captain_id = $3
                    "#,
                )
                .bind(now)
                .bind(offer.request_id)
                .bind(offer.captain_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
                if reverted == 0 {
                    tx.rollback().await?;
                    return Ok(CascadeOutcome::Superseded);
                }
                CascadeOutcome::Exhausted
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn accept_with_trip(
        &self,
        offer: &LiveRideOffer,
        trip: &NewTrip,
    ) -> Result<AcceptOutcome, BoxError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query(
            "UPDATE live_ride_offers SET status = 'ACCEPTED' WHERE id = $1 AND status = 'OFFERED'",
        )
        .bind(offer.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if accepted == 0 {
            tx.rollback().await?;
            return Ok(AcceptOutcome::Superseded);
        }

        let trip_id = Uuid::new_v4();
        let snapshot = serde_json::to_value(&trip.pricing_snapshot)?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO trips
                (id, boat_id, created_by_id, status, start_at, end_at, passenger_count,
                 notes, pricing_snapshot, subtotal_cents, commission_rate, commission_cents,
                 total_cents, currency, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(trip_id)
        .bind(trip.boat_id)
        .bind(trip.created_by_id)
        .bind(trip.status.to_string())
        .bind(trip.start_at)
        .bind(trip.end_at)
        .bind(trip.passenger_count)
        .bind(&trip.notes)
        .bind(&snapshot)
        .bind(trip.subtotal_cents)
        .bind(trip.commission_rate)
        .bind(trip.commission_cents)
        .bind(trip.total_cents)
        .bind(&trip.currency)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            // 23P01: the boat/window exclusion constraint fired, another
            // trip claimed this boat first.
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.code().as_deref() == Some("23P01") {
                    tx.rollback().await?;
                    return Ok(AcceptOutcome::BoatBusy);
                }
            }
            return Err(err.into());
        }

        let resolved = sqlx::query(
            r#"
            UPDATE live_ride_requests
            SET status = 'ACCEPTED', offered_to_captain_id = NULL, trip_id = $1, updated_at = $2
            WHERE id = $3 AND status = 'OFFERED' AND offered_to_captain_id = $4
            "#,
        )
        .bind(trip_id)
        .bind(now)
        .bind(offer.request_id)
        .bind(offer.captain_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if resolved == 0 {
            tx.rollback().await?;
            return Ok(AcceptOutcome::Superseded);
        }

        tx.commit().await?;

        Ok(AcceptOutcome::Accepted(Trip {
            id: trip_id,
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
        }))
    }
}
