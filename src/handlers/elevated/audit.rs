use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Extension;

use crate::auth::Role;
use crate::inventory::{AuditEntry, AuditQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/v1/audit?product_id=&action=&limit= - Newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ApiResult<Vec<AuditEntry>> {
    user.require(Role::Administrator)?;
    let Query(query) = query?;
    let entries = state.store.list_audit(&query).await?;
    Ok(ApiResponse::success(entries))
}
