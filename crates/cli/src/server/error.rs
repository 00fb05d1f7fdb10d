//! Mapping of pipeline errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ragline_core::AppError;
use serde_json::json;

/// `AppError` as returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if self.0.is_upstream_error() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self.0);
        } else {
            tracing::info!(status = status.as_u16(), "Request rejected: {}", self.0);
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("short".into()), StatusCode::BAD_REQUEST),
            (AppError::ModelInvocation("timeout".into()), StatusCode::BAD_GATEWAY),
            (AppError::ModelAuth("rejected".into()), StatusCode::BAD_GATEWAY),
            (AppError::Knowledge("embed".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::RetrieverUnavailable("gone".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Other("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
