//! Application-wide error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use points_ledger::LedgerError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Ledger error code, absent for infrastructure failures.
    pub code: Option<u32>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(LedgerError::InvalidAmount(_))
            | Self::Ledger(LedgerError::GoalExceeded { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Ledger(LedgerError::InsufficientBalance { .. }) => StatusCode::CONFLICT,
            Self::Ledger(LedgerError::UnknownEntity { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }
        let code = match &self {
            Self::Ledger(e) => Some(e.code()),
            _ => None,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code,
            }),
        )
            .into_response()
    }
}
