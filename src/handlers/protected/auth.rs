use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/v1/auth/me - The user behind the current session
pub async fn me(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(user))
}
