use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use marea_catalog::CaptainRef;
use marea_core::identity::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Access-token claims issued by the auth subsystem.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub exp: usize,
}

/// Validate the bearer token and inject [`Claims`] into request extensions.
/// Every live-ride and notification route sits behind this.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}

/// Resolve the acting captain: the role must allow captaining and a captain
/// profile must exist for the account.
pub async fn require_captain(state: &AppState, claims: &Claims) -> Result<CaptainRef, AppError> {
    let role: UserRole = claims
        .role
        .parse()
        .map_err(|_| AppError::AuthorizationError("Captain access required".to_string()))?;
    if !role.can_captain() {
        return Err(AppError::AuthorizationError(
            "Captain access required".to_string(),
        ));
    }

    state
        .captains
        .captain_for_user(claims.sub)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::AuthorizationError("Captain profile not found".to_string()))
}
