//! HTTP error responses.
//!
//! Errors render as `{"detail": "..."}`, the shape browser clients read.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::relay::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client input rejected before any backend call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The body was not valid JSON or did not match the request shape.
    #[error("{}", .0.body_text())]
    Payload(#[from] JsonRejection),

    /// The relay returned a soft failure.
    #[error("Failed to generate response: {0}")]
    Generation(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Payload(rejection) => rejection.status(),
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
