use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Handler result type.
pub type AppResult<T> = Result<T, AppError>;

/// AppError
///
/// Every failure a handler can report. Each variant maps to exactly one HTTP status and
/// renders as the `{ "success": false, "error": ... }` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to clients. Server-side detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Unique-constraint names from the migrations and the conflict each one reports.
const UNIQUE_CONFLICTS: &[(&str, &str)] = &[
    ("admins_username_key", "Username already exists"),
    ("students_nisn_key", "NISN already registered"),
    ("students_email_key", "Email already registered"),
];

/// A unique violation becomes 409 so a request that loses an insert race still gets the
/// same answer as one caught by the up-front existence check.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = db_err
                    .constraint()
                    .and_then(|name| {
                        UNIQUE_CONFLICTS
                            .iter()
                            .find(|(constraint, _)| *constraint == name)
                    })
                    .map_or("Resource already exists", |(_, message)| *message);
                return Self::Conflict(message.to_string());
            }
        }
        Self::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        (status, Json(ApiResponse::<()>::failure(self.public_message()))).into_response()
    }
}
