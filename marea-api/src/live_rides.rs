use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use marea_dispatch::CreateLiveRide;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{require_captain, Claims};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/live-rides", post(create_live_ride))
        .route("/v1/live-rides/{id}/accept", post(accept_live_ride))
        .route("/v1/live-rides/{id}/reject", post(reject_live_ride))
}

/// POST /v1/live-rides
/// Create a request and offer it to the first eligible captain.
async fn create_live_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateLiveRide>,
) -> Result<Json<serde_json::Value>, AppError> {
    let created = state
        .dispatcher
        .create_request(claims.sub, &body)
        .await
        .map_err(AppError::from_domain)?;

    Ok(Json(json!({ "liveRide": created })))
}

/// POST /v1/live-rides/{id}/accept
/// Captain accepts the current offer; the trip starts immediately.
async fn accept_live_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let captain = require_captain(&state, &claims).await?;
    let trip = state
        .dispatcher
        .accept_offer(id, &captain)
        .await
        .map_err(AppError::from_domain)?;

    Ok(Json(json!({ "trip": trip })))
}

/// POST /v1/live-rides/{id}/reject
/// Captain rejects; the request cascades to the next eligible captain.
async fn reject_live_ride(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let captain = require_captain(&state, &claims).await?;
    state
        .dispatcher
        .reject_offer(id, &captain)
        .await
        .map_err(AppError::from_domain)?;

    Ok(Json(json!({ "ok": true })))
}
