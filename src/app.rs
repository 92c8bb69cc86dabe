use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Full HTTP surface: public routes, then everything behind the session
/// middleware, then CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        .merge(protected_routes(state.clone()))
        .layer(cors_layer(&state.config.security.cors_origins));

    if state.config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/login", post(public::login))
        .route("/api/v1/auth/logout", post(public::logout))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/me", get(protected::me))
        .route("/api/v1/inventory", get(protected::list).post(protected::create))
        .route("/api/v1/inventory/grouped", get(protected::grouped))
        .route(
            "/api/v1/inventory/:id",
            get(protected::get).put(protected::update).delete(protected::delete),
        )
        .route("/api/v1/inventory/:id/assign", post(protected::assign))
        .route("/api/v1/inventory/:id/loan", post(protected::loan))
        .route("/api/v1/inventory/:id/return", post(protected::return_to_stock))
        .route("/api/v1/inventory/:id/maintenance", post(protected::maintenance))
        .route("/api/v1/inventory/:id/retire", post(protected::retire))
        .route("/api/v1/audit", get(elevated::audit_list))
        .route("/api/v1/users", get(elevated::users_list).post(elevated::users_create))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

/// Credentialed CORS for the configured frontend origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        app(AppState::new(AppConfig::development(), Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let response = router()
            .oneshot(Request::get("/api/v1/inventory").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let response = router()
            .oneshot(Request::get("/api/v2/inventory").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_allows_the_frontend_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/inventory")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).and_then(|v| v.to_str().ok()),
            Some("true")
        );
    }
}
