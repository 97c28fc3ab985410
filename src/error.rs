//! Application error taxonomy and HTTP status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::dto::ApiResponse;

/// Errors surfaced by the service and repository layers.
///
/// Handlers render these as the standard response envelope; the HTTP status
/// comes from [`AppError::status`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database connection is not initialized")]
    MissingConnection,

    #[error("missing identifier")]
    MissingId,

    #[error("update payload is empty")]
    MissingUpdate,

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::MissingConnection
            | AppError::MissingId
            | AppError::MissingUpdate
            | AppError::Cancelled
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stacktrace-style detail carried in the envelope for failures.
    pub fn detail(&self) -> String {
        match self {
            AppError::Database(e) => format!("error: {e:?}"),
            AppError::Internal(e) => format!("error: {e:?}"),
            other => format!("error: {other}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::failure(status, self.to_string(), Some(self.detail()));
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::NotFound("user".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::Cancelled.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::MissingConnection.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::MissingUpdate.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
