//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, plus the
//! mapping from pipeline failures to structured HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use practice_lab_core::{PipelineError, PortError};
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Wraps a `PipelineError` so handlers can use `?` and still produce the
/// structured `{"error": ...}` response with the right status code.
#[derive(Debug)]
pub struct RequestError(pub PipelineError);

impl From<PipelineError> for RequestError {
    fn from(err: PipelineError) -> Self {
        RequestError(err)
    }
}

impl From<PortError> for RequestError {
    fn from(err: PortError) -> Self {
        RequestError(PipelineError::from(err))
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::MalformedModelOutput(_) => StatusCode::BAD_GATEWAY,
            PipelineError::NoveltyExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::NoCaseAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response =
            RequestError(PipelineError::Validation("bad input".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = RequestError(PipelineError::NotFound("case".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn exhausted_novelty_maps_to_503() {
        let response =
            RequestError(PipelineError::NoveltyExhausted { attempts: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn malformed_output_maps_to_502() {
        let response =
            RequestError(PipelineError::MalformedModelOutput("not json".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
