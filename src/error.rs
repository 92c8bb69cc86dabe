// HTTP API Error Types
use axum::{extract::rejection::{JsonRejection, QueryRejection}, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::models::NewUserError;
use crate::database::StoreError;
use crate::inventory::InventoryError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Failure envelope: `{ success: false, error: { code, message, field_errors? } }`
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "code": self.error_code(),
            "message": self.message(),
        });
        if let ApiError::ValidationError { field_errors: Some(fields), .. } = self {
            error["field_errors"] = json!(fields);
        }
        json!({ "success": false, "error": error })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::Conflict(msg) => ApiError::conflict(msg),
            StoreError::QueryError(msg) => {
                // Bad filter input reaches us as a query error
                ApiError::bad_request(msg)
            }
            StoreError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::ServiceUnavailable("Database temporarily unavailable".to_string())
            }
            other => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Store error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(fields) => {
                ApiError::validation_error("Validation failed", Some(fields.into_map()))
            }
            InventoryError::InvalidTransition { .. } => ApiError::conflict(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InactiveUser => {
                ApiError::unauthorized(err.to_string())
            }
            AuthError::InvalidToken(detail) => {
                tracing::warn!("Rejected token: {}", detail);
                ApiError::unauthorized("Invalid or expired session")
            }
            AuthError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
            AuthError::TokenGeneration(_) | AuthError::Hashing(_) => {
                tracing::error!("Auth failure: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<NewUserError> for ApiError {
    fn from(err: NewUserError) -> Self {
        match err {
            NewUserError::Invalid(e) => e.into(),
            NewUserError::Auth(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::inventory::{FieldErrors, ProductStatus};

    #[test]
    fn validation_errors_carry_fields() {
        let err: ApiError = InventoryError::Validation(FieldErrors::single("name", "This field is required")).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field_errors"]["name"], "This field is required");
    }

    #[test]
    fn maps_error_kinds_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (AuthError::MissingToken.into(), StatusCode::UNAUTHORIZED),
            (AuthError::Forbidden { required: Role::Editor }.into(), StatusCode::FORBIDDEN),
            (StoreError::NotFound("x".into()).into(), StatusCode::NOT_FOUND),
            (StoreError::Conflict("x".into()).into(), StatusCode::CONFLICT),
            (StoreError::Decode("x".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
            (
                InventoryError::InvalidTransition { action: "loan", status: ProductStatus::Retired }.into(),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err: ApiError = StoreError::Decode("role column held 'root'".into()).into();
        assert!(!err.message().contains("root"));
        assert!(err.to_json()["error"].get("field_errors").is_none());
    }
}
