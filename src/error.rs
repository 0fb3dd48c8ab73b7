// src/error.rs
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::validation::Issue;

/// Failures raised by a [`crate::store::PollStore`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Another poll already holds this access code.
    #[error("duplicate access code")]
    DuplicateAccessCode,

    /// The `(poll_id, voter_email)` pair already has a vote.
    #[error("duplicate vote")]
    DuplicateVote,
}

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<Issue>),

    #[error("Invalid request body: {0}")]
    MalformedPayload(String),

    #[error("Invalid access code format. Code must be exactly 8 characters.")]
    InvalidAccessCode,

    #[error("Poll not found")]
    PollNotFound,

    #[error("Poll not found. Please check the access code and try again.")]
    AccessCodeNotFound,

    #[error("Results are not available until voting closes")]
    ResultsHidden,

    #[error("Voting has closed for this poll")]
    VotingClosed,

    #[error("Invalid poll option")]
    InvalidOption,

    #[error("You have already voted in this poll")]
    AlreadyVoted,

    #[error("Failed to generate unique access code. Please try again.")]
    AccessCodeExhausted,

    #[error("Failed to create poll options. Please try again.")]
    OptionsInsert,

    #[error("An unexpected error occurred. Please try again.")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::MalformedPayload(_)
            | AppError::InvalidAccessCode
            | AppError::InvalidOption => StatusCode::BAD_REQUEST,
            AppError::PollNotFound | AppError::AccessCodeNotFound => StatusCode::NOT_FOUND,
            AppError::ResultsHidden => StatusCode::FORBIDDEN,
            AppError::VotingClosed => StatusCode::GONE,
            AppError::AlreadyVoted => StatusCode::CONFLICT,
            AppError::AccessCodeExhausted | AppError::OptionsInsert | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Store(ref e) = self {
            error!("store failure: {e}");
        }

        let body = match self {
            AppError::Validation(issues) => json!({
                "error": "Validation failed",
                "issues": issues,
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidAccessCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::PollNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::ResultsHidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::VotingClosed.status(), StatusCode::GONE);
        assert_eq!(AppError::AlreadyVoted.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Store(StoreError::DuplicateVote).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_message_is_generic() {
        let err = AppError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(
            err.to_string(),
            "An unexpected error occurred. Please try again."
        );
    }
}
