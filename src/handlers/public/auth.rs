// handlers/public/auth.rs - POST /api/v1/auth/login, POST /api/v1/auth/logout
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::auth::{clear_session_cookie, session_cookie};
use crate::middleware::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/login - Verify credentials and set the session cookie.
///
/// The token only travels in the httpOnly `token` cookie; the body carries
/// the user and the session lifetime.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let service = AuthService::new(state.store.clone(), state.jwt.clone());
    let session = service.login(&request.email, &request.password).await?;

    let cookie = session_cookie(&session.token, state.jwt.ttl_secs(), state.config.security.cookie_secure);
    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiResponse::success(json!({
            "user": session.user,
            "expires_in": state.jwt.ttl_secs(),
        })),
    ))
}

/// POST /api/v1/auth/logout - Clear the session cookie. Idempotent.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie(state.config.security.cookie_secure))],
        ApiResponse::success(json!({ "logged_out": true })),
    )
}
