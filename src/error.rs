use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::handlers::shared::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    InternalServerError(Option<String>),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        if status_code.is_server_error() {
            log::error!(
                "Request failed with status {}: {}",
                status_code,
                error_message
            );
        } else {
            log::info!("Request rejected with status {}: {}", status_code, error_message);
        }

        let response_body = ApiResponse::<()>::error(&error_message);

        HttpResponse::build(status_code).json(response_body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl AppError {
    pub fn internal_server_error_message(message: impl Into<String>) -> Self {
        AppError::InternalServerError(Some(message.into()))
    }

    /// Maps a unique-key violation to `Conflict`, anything else to `DatabaseError`.
    pub fn conflict_on_unique(error: sqlx::Error, message: impl Into<String>) -> Self {
        let is_unique = matches!(
            &error,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation()
        );

        if is_unique {
            AppError::Conflict(message.into())
        } else {
            AppError::from(error)
        }
    }
}

/// A computation that could not produce its value but must not block payroll.
///
/// Engine functions prefixed with `try_` return this; their plain counterparts
/// log it and degrade to a zero or empty value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoftFailure {
    #[error("reference table unavailable: {0}")]
    TableUnavailable(String),

    #[error("no row matches salary {0:.2}")]
    NoMatchingRow(f64),

    #[error("malformed attendance: {0}")]
    MalformedAttendance(String),
}

pub trait SoftFallback<T> {
    /// Returns the value, or `T::default()` after logging the soft failure.
    fn or_soft_default(self, context: &str) -> T;
}

impl<T: Default> SoftFallback<T> for Result<T, SoftFailure> {
    fn or_soft_default(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(failure) => {
                log::warn!("{} degraded to default: {}", context, failure);
                T::default()
            }
        }
    }
}
