// handlers/protected/inventory.rs - Inventory listing and CRUD
use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Extension, Json,
};
use url::form_urlencoded;

use crate::auth::Role;
use crate::handlers::parse_id;
use crate::inventory::{GroupRow, InventoryFilter, NewProduct, ProductUpdate, ProductView};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::InventoryService;
use crate::state::AppState;
use crate::types::Page;

/// Decodes the list query string, applying the configured page size limits.
fn filter_from_query(state: &AppState, query: Option<&str>) -> InventoryFilter {
    let query = query.unwrap_or_default();
    let mut filter = InventoryFilter::from_query_str(query);
    let has_per_page = form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "per_page");
    if !has_per_page {
        filter.per_page = state.config.inventory.default_per_page;
    }
    filter.with_max_per_page(state.config.inventory.max_per_page)
}

/// GET /api/v1/inventory
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    RawQuery(query): RawQuery,
) -> ApiResult<Page<ProductView>> {
    user.require(Role::Reader)?;
    let filter = filter_from_query(&state, query.as_deref());
    tracing::debug!(query = %filter.to_query_string(), "List inventory");
    let page = InventoryService::new(state.store.clone()).list(&filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/v1/inventory/grouped - Same page as the flat list, folded into rows
pub async fn grouped(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    RawQuery(query): RawQuery,
) -> ApiResult<Page<GroupRow<ProductView>>> {
    user.require(Role::Reader)?;
    let filter = filter_from_query(&state, query.as_deref());
    let page = InventoryService::new(state.store.clone()).grouped(&filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/v1/inventory/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<ProductView> {
    user.require(Role::Reader)?;
    let view = InventoryService::new(state.store.clone()).get(parse_id(&id)?).await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/v1/inventory
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<ProductView> {
    user.require(Role::Editor)?;
    let Json(input) = payload?;
    let view = InventoryService::new(state.store.clone()).create(input, &user.email).await?;
    Ok(ApiResponse::created(view))
}

/// PUT /api/v1/inventory/:id - Partial update of descriptive fields.
/// Status only changes through the workflow endpoints.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<ProductView> {
    user.require(Role::Editor)?;
    let id = parse_id(&id)?;
    let Json(update) = payload?;
    let view = InventoryService::new(state.store.clone()).update(id, update, &user.email).await?;
    Ok(ApiResponse::success(view))
}

/// DELETE /api/v1/inventory/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(Role::Administrator)?;
    InventoryService::new(state.store.clone()).delete(parse_id(&id)?, &user.email).await?;
    Ok(ApiResponse::no_content())
}
