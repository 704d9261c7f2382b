use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use horizon_core::errors::{ApplicationError, ErrorCode, FieldError};
use horizon_db::RepositoryError;

use crate::auth::AuthError;

/// Errors a handler can return. Tool failures are not among them: tools
/// answer with a `success = false` body and a 200 status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: ErrorCode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<FieldError>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String, Vec<FieldError>) {
        match self {
            Self::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationError,
                self.to_string(),
                fields.clone(),
            ),
            Self::Auth(error) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::AuthError, error.to_string(), Vec::new())
            }
            Self::Application(ApplicationError::Validation(fields)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationError,
                "request validation failed".to_string(),
                fields.clone(),
            ),
            Self::Application(error @ ApplicationError::Domain(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationError,
                error.to_string(),
                Vec::new(),
            ),
            Self::Application(error @ ApplicationError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, ErrorCode::NotFound, error.to_string(), Vec::new())
            }
            Self::Application(error @ ApplicationError::Integration(_)) => {
                (StatusCode::BAD_GATEWAY, ErrorCode::ApiFailure, error.to_string(), Vec::new())
            }
            Self::Application(error @ ApplicationError::Network(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorCode::NetworkError, error.to_string(), Vec::new())
            }
            Self::Application(error) => {
                tracing::error!(event_name = "server.request.internal_error", error = %error, "internal error");
                internal()
            }
            Self::Repository(error) => {
                tracing::error!(event_name = "server.request.database_error", error = %error, "database error");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, ErrorCode, String, Vec<FieldError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::InternalError,
        "an internal error occurred".to_string(),
        Vec::new(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error, details) = self.parts();
        (status, Json(ErrorBody { error, code, details })).into_response()
    }
}
