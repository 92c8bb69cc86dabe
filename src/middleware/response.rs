use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Successful handler output. Serialized as `{ "success": true, "data": ... }`
/// except for 204, which has no body.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { data, status_code: StatusCode::OK }
    }

    pub fn created(data: T) -> Self {
        Self { data, status_code: StatusCode::CREATED }
    }

    fn envelope(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({ "success": true, "data": serde_json::to_value(&self.data)? }))
    }
}

impl ApiResponse<()> {
    pub fn no_content() -> Self {
        Self { data: (), status_code: StatusCode::NO_CONTENT }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        if self.status_code == StatusCode::NO_CONTENT {
            return self.status_code.into_response();
        }
        match self.envelope() {
            Ok(body) => (self.status_code, Json(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal_server_error("Failed to format response").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_data_in_success_envelope() {
        let response = ApiResponse::created(json!({ "id": 7 }));
        assert_eq!(response.status_code, StatusCode::CREATED);
        assert_eq!(response.envelope().unwrap(), json!({ "success": true, "data": { "id": 7 } }));
    }

    #[test]
    fn no_content_has_empty_body() {
        let response = ApiResponse::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get("content-type").is_none());
    }
}
