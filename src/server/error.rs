//! Request-level errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced to HTTP clients as status codes.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Failed to encode registry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No registered file for {0}")]
    NotFound(String),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        match self {
            ServeError::Serialization(_) => {
                tracing::error!("[http] {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate JSON",
                )
                    .into_response()
            }
            ServeError::NotFound(_) => {
                crate::debug_event!("http", "not found", "{self}");
                (StatusCode::NOT_FOUND, "404 page not found").into_response()
            }
        }
    }
}
