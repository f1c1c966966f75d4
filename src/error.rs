// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::actions::codes;

/// Errors raised by the HTTP layer before an action ever runs
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 404 Not Found
    NotFound(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::NotFound(msg) => msg,
        }
    }

    /// Same envelope as a failed action
    pub fn to_json(&self) -> Value {
        json!({
            "data": null,
            "error": self.message(),
        })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

/// HTTP status for an action failure code; uncoded failures are server faults
pub fn status_for_code(code: Option<&str>) -> StatusCode {
    match code {
        Some(codes::UNAUTHORIZED) | Some(codes::INVALID_CREDENTIALS) => StatusCode::UNAUTHORIZED,
        Some(codes::FORBIDDEN) | Some(codes::UNVERIFIED_EMAIL) => StatusCode::FORBIDDEN,
        Some(codes::NOT_FOUND) => StatusCode::NOT_FOUND,
        Some(codes::CONFLICT) | Some(codes::ALREADY_VERIFIED) => StatusCode::CONFLICT,
        Some(codes::VALIDATION_ERROR) => StatusCode::BAD_REQUEST,
        Some(codes::INVALID_REFERENCE) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(codes::TIMEOUT) => StatusCode::GATEWAY_TIMEOUT,
        Some(_) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_statuses() {
        assert_eq!(status_for_code(Some(codes::UNAUTHORIZED)), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for_code(Some(codes::FORBIDDEN)), StatusCode::FORBIDDEN);
        assert_eq!(status_for_code(Some(codes::NOT_FOUND)), StatusCode::NOT_FOUND);
        assert_eq!(status_for_code(Some(codes::ALREADY_VERIFIED)), StatusCode::CONFLICT);
        assert_eq!(status_for_code(Some(codes::INVALID_REFERENCE)), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for_code(Some(codes::TIMEOUT)), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for_code(None), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn api_error_uses_action_envelope() {
        let err = ApiError::invalid_json("Malformed request body");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_json(), json!({ "data": null, "error": "Malformed request body" }));
    }
}
