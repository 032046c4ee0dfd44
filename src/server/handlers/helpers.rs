//! Helper types and utility functions for handlers.

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::super::AppState;
use crate::models::JsonMap;
use crate::rate_limit::{RateLimitError, RouteKey};

/// Header carrying the admin token for destructive endpoints.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// `{status, message}` body returned by every mutating endpoint.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub status: &'static str,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
        })
    }

    fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error",
            message: message.into(),
        })
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid or missing admin token")]
    Unauthorized,
    #[error("Endpoint not found")]
    NotFound,
    #[error("Request too large")]
    PayloadTooLarge,
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after: Duration },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, ApiMessage::error(self.to_string())).into_response();
        if let ApiError::RateLimited { retry_after } = self {
            // Whole seconds, rounded up so clients never retry early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Exceeded { retry_after, .. } => ApiError::RateLimited { retry_after },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest("Invalid JSON format".to_string())
        }
    }
}

/// Charge one request against `route` for `client`.
pub fn rate_limit(state: &AppState, route: RouteKey, client: &str) -> Result<(), ApiError> {
    Ok(state.rate_limiter.check(route, client)?)
}

/// Unwrap a JSON body that must be an object.
pub fn object_body(body: Result<Json<Value>, JsonRejection>) -> Result<JsonMap, ApiError> {
    match body? {
        Json(Value::Object(map)) => Ok(map),
        Json(_) => Err(ApiError::BadRequest(
            "Data must be a JSON object".to_string(),
        )),
    }
}

/// Reject the request unless it carries the configured admin token.
///
/// Without a configured token every request passes.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.settings.admin_token.as_deref() else {
        return Ok(());
    };
    let supplied = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if supplied == Some(expected) {
        Ok(())
    } else {
        warn!("Rejected admin request with missing or wrong token");
        Err(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_millis(2500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }

    #[test]
    fn test_object_body_rejects_arrays() {
        let err = object_body(Ok(Json(serde_json::json!([1, 2])))).unwrap_err();
        assert_eq!(err.to_string(), "Data must be a JSON object");
    }
}
