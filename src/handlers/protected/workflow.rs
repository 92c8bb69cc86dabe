// handlers/protected/workflow.rs - Status transitions, Editor and above
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::auth::Role;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::inventory::{AssignRequest, LoanRequest, ProductView, RetireRequest};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{InventoryService, WorkflowAction};
use crate::state::AppState;

/// Readers get 403 even when the body is malformed.
async fn run(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    action: Result<WorkflowAction, ApiError>,
) -> ApiResult<ProductView> {
    user.require(Role::Editor)?;
    let id = parse_id(id)?;
    let action = action?;
    let view = InventoryService::new(state.store.clone()).transition(id, action, &user.email).await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/v1/inventory/:id/assign
pub async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<ProductView> {
    let action = payload.map(|Json(request)| WorkflowAction::Assign(request)).map_err(ApiError::from);
    run(&state, &user, &id, action).await
}

/// POST /api/v1/inventory/:id/loan
pub async fn loan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<LoanRequest>, JsonRejection>,
) -> ApiResult<ProductView> {
    let action = payload.map(|Json(request)| WorkflowAction::Loan(request)).map_err(ApiError::from);
    run(&state, &user, &id, action).await
}

/// POST /api/v1/inventory/:id/return
pub async fn return_to_stock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<ProductView> {
    run(&state, &user, &id, Ok(WorkflowAction::Return)).await
}

/// POST /api/v1/inventory/:id/maintenance
pub async fn maintenance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<ProductView> {
    run(&state, &user, &id, Ok(WorkflowAction::Maintenance)).await
}

/// POST /api/v1/inventory/:id/retire
pub async fn retire(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<RetireRequest>, JsonRejection>,
) -> ApiResult<ProductView> {
    let action = payload.map(|Json(request)| WorkflowAction::Retire(request)).map_err(ApiError::from);
    run(&state, &user, &id, action).await
}
