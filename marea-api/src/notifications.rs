use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications/me", get(my_notifications))
        .route("/v1/notifications/{id}/read", post(mark_read))
        .route("/v1/notifications/read-all", post(mark_all_read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationsQuery {
    #[serde(default)]
    unread_only: bool,
    limit: Option<i64>,
}

/// GET /v1/notifications/me
/// The inbox poll. Runs an expiry sweep first so stale offers are reclaimed
/// on the polling cadence even without a dedicated timer.
async fn my_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Err(err) = state.dispatcher.sweep_expired(Utc::now()).await {
        tracing::warn!(error = %err, "expiry sweep failed during notification poll");
    }

    let limit = query.limit.unwrap_or(20).clamp(1, 50);
    let unread_count = state
        .notifications
        .unread_count(claims.sub)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let notifications = state
        .notifications
        .list_for_user(claims.sub, query.unread_only, limit)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({
        "unreadCount": unread_count,
        "notifications": notifications,
    })))
}

/// POST /v1/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let notification = state
        .notifications
        .get(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError("Notification not found".to_string()))?;

    if notification.user_id != claims.sub {
        return Err(AppError::AuthorizationError("Not yours".to_string()));
    }

    state
        .notifications
        .mark_read(id, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({ "ok": true })))
}

/// POST /v1/notifications/read-all
async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .notifications
        .mark_all_read(claims.sub, Utc::now())
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({ "ok": true })))
}
