//! `StorefrontError` as an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::StorefrontError;

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Validation(errors) => json!({ "message": "Validation failed", "errors": errors }),
            Self::EmptyCart => json!({
                "message": self.to_string(),
                "hint": "Add at least one item to the cart before checking out",
            }),
            Self::Forbidden(message) | Self::Conflict(message) => json!({ "message": message }),
            Self::NotFound(_) | Self::Unauthenticated => json!({ "message": self.to_string() }),
            Self::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                json!({ "message": "Internal server error" })
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                json!({ "message": "Internal server error" })
            }
        };
        (status, axum::Json(body)).into_response()
    }
}
