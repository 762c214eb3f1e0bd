use async_trait::async_trait;
use marea_catalog::{CaptainDirectory, CaptainRef};
use marea_dispatch::repository::{BoxError, CandidateSource};
use marea_dispatch::{Candidate, TimeWindow};
use marea_shared::Route;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresCandidateRepository {
    pool: PgPool,
}

impl PostgresCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    captain_id: Uuid,
    captain_user_id: Uuid,
    boat_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct CaptainRow {
    id: Uuid,
    user_id: Uuid,
}

#[async_trait]
impl CandidateSource for PostgresCandidateRepository {
    async fn live_candidates(
        &self,
        route: Route,
        passenger_count: i32,
        window: &TimeWindow,
    ) -> Result<Vec<Candidate>, BoxError> {
        // One row per captain: their earliest-created eligible boat
        // (DISTINCT ON with boat ordering), captains in stable creation
        // order.
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT captain_id, captain_user_id, boat_id FROM (
                SELECT DISTINCT ON (c.id)
                    c.id AS captain_id,
                    c.user_id AS captain_user_id,
                    b.id AS boat_id,
                    c.created_at AS captain_created_at
                FROM captains c
                JOIN boats b ON b.captain_id = c.id
                WHERE b.live_rides_on
                  AND b.max_passengers >= $1
                  AND EXISTS (
                      SELECT 1 FROM boat_route_pricings p
                      WHERE p.boat_id = b.id AND p.route = $2
                  )
                  AND NOT EXISTS (
                      SELECT 1 FROM trips t
                      WHERE t.boat_id = b.id
                        AND t.status IN ('ACCEPTED', 'ACTIVE')
                        AND t.start_at < $4
                        AND t.end_at > $3
                  )
                ORDER BY c.id, b.created_at ASC, b.id ASC
            ) eligible
            ORDER BY captain_created_at ASC, captain_id ASC
            "#,
        )
        .bind(passenger_count)
        .bind(route.as_str())
        .bind(window.start_at)
        .bind(window.end_at)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Candidate {
                captain_id: row.captain_id,
                captain_user_id: row.captain_user_id,
                boat_id: row.boat_id,
            })
            .collect())
    }
}

#[async_trait]
impl CaptainDirectory for PostgresCandidateRepository {
    async fn captain_for_user(&self, user_id: Uuid) -> Result<Option<CaptainRef>, BoxError> {
        let row = sqlx::query_as::<_, CaptainRow>(
            "SELECT id, user_id FROM captains WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|c| CaptainRef {
            id: c.id,
            user_id: c.user_id,
        }))
    }
}
