use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "GATI-C",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Inventory management API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/v1/auth/login, /api/v1/auth/logout (public), /api/v1/auth/me (protected)",
                "inventory": "/api/v1/inventory[/:id] (protected)",
                "grouped": "/api/v1/inventory/grouped (protected)",
                "workflows": "/api/v1/inventory/:id/{assign,loan,return,maintenance,retire} (Editor)",
                "audit": "/api/v1/audit (Administrator)",
                "users": "/api/v1/users (Administrator)",
            }
        }
    }))
}

/// GET /health - Liveness plus a store round-trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": { "code": "SERVICE_UNAVAILABLE", "message": "database unavailable" },
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
