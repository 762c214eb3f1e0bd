use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marea_dispatch::repository::{BoxError, NotificationStore};
use marea_shared::models::{Notification, NotificationKind};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    live_ride_request_id: Option<Uuid>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_model(self) -> Result<Notification, BoxError> {
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            kind: self.kind.parse::<NotificationKind>()?,
            live_ride_request_id: self.live_ride_request_id,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationRepository {
    async fn unread_count(&self, user_id: Uuid) -> Result<i64, BoxError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, BoxError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, kind, live_ride_request_id, read_at, created_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = false OR read_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRow::into_model).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, BoxError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, kind, live_ride_request_id, read_at, created_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(NotificationRow::into_model).transpose()
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), BoxError> {
        sqlx::query("UPDATE notifications SET read_at = $1 WHERE id = $2 AND read_at IS NULL")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BoxError> {
        sqlx::query("UPDATE notifications SET read_at = $1 WHERE user_id = $2 AND read_at IS NULL")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
