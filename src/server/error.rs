//! API error type with structured JSON responses.

use crate::formats::FormatError;
use crate::generator::GenerateError;
use crate::template::TemplateError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Realm advertised in `WWW-Authenticate`.
pub const AUTH_REALM: &str = "chapterlinks";

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Generate(GenerateError::Template(
                TemplateError::ForbiddenField { .. } | TemplateError::NestedField { .. },
            )) => (StatusCode::BAD_REQUEST, "UNSAFE_TEMPLATE"),
            ApiError::Generate(GenerateError::Template(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_TEMPLATE")
            }
            ApiError::Generate(GenerateError::RangeTooLarge { .. }) => {
                (StatusCode::BAD_REQUEST, "RANGE_TOO_LARGE")
            }
            ApiError::Generate(_) => (StatusCode::BAD_REQUEST, "INVALID_RANGE"),
            ApiError::Format(FormatError::UnknownFormat(_)) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_FORMAT")
            }
            ApiError::Format(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "API internal error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        let mut response = (status, Json(body)).into_response();
        if let ApiError::Unauthorized = self {
            if let Ok(val) = HeaderValue::from_str(&format!("Basic realm=\"{}\"", AUTH_REALM)) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, val);
            }
        }
        response
    }
}
