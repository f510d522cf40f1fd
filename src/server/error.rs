use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::sql::SqlError;

/// Failure of a filter endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Database failure, task failure or timeout. The detail is logged and
    /// never sent to the client.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Upstream(_) => "upstream",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            ApiError::Upstream(ref detail) => {
                error!("{detail}");
                "the filter query could not be completed".to_string()
            }
            ApiError::Validation(ref msg) | ApiError::NotFound(ref msg) => msg.clone(),
        };

        let body = ErrorResponse {
            error: self.kind(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<SqlError> for ApiError {
    fn from(err: SqlError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Upstream(format!("database error: {err}"))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Upstream(format!("{err:#}"))
    }
}
