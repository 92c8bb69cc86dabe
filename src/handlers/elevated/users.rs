use axum::extract::{rejection::JsonRejection, State};
use axum::{Extension, Json};

use crate::auth::Role;
use crate::database::models::{NewUser, User};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::AuthService;
use crate::state::AppState;

/// GET /api/v1/users
pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<User>> {
    user.require(Role::Administrator)?;
    let users = AuthService::new(state.store.clone(), state.jwt.clone()).list_users().await?;
    Ok(ApiResponse::success(users))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<User> {
    user.require(Role::Administrator)?;
    let Json(input) = payload?;
    let created = AuthService::new(state.store.clone(), state.jwt.clone()).create_user(input).await?;
    tracing::info!(admin = %user.email, user = %created.email, "Account created by administrator");
    Ok(ApiResponse::created(created))
}
