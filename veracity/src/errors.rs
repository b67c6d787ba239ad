use crate::db::errors::DbError;
use crate::quota::QuotaStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or credentials invalid/revoked
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Caller is authenticated but may not touch the resource
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Monthly quota exhausted. Carries the fresh quota state so the caller
    /// can still render limit/used/reset headers on the error path.
    #[error("Monthly quota exceeded")]
    QuotaExceeded { status: QuotaStatus },

    /// A submitted URL failed safety validation (blocked domain, SSRF-unsafe
    /// target, redirect ceiling, malformed redirect). Never downgraded to success.
    #[error("URL rejected: {reason}")]
    UnsafeUrl { reason: String },

    /// Extracted content failed quality validation. Reasons accumulate; this is
    /// a structured rejection, not a hard failure.
    #[error("Content rejected")]
    ContentRejected { reasons: Vec<String> },

    /// Conflict, e.g. for unique constraint violations
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::UnsafeUrl { .. } => StatusCode::BAD_REQUEST,
            Error::ContentRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { message } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::QuotaExceeded { status } => format!(
                "Monthly quota exceeded: {} of {} requests used on the {} tier. Resets at {}.",
                status.used,
                status.limit,
                status.tier,
                status.resets_at.to_rfc3339()
            ),
            Error::UnsafeUrl { reason } => format!("URL rejected: {reason}"),
            Error::ContentRejected { reasons } => format!("Content rejected: {}", reasons.join("; ")),
            Error::Conflict { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::QuotaExceeded { .. } => {
                tracing::info!("Quota exhausted: {}", self);
            }
            Error::UnsafeUrl { .. } | Error::ContentRejected { .. } => {
                tracing::info!("Submission rejected: {}", self.user_message());
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::Conflict { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // The quota-exceeded path still carries the full quota header set so
            // clients can self-serve off the error response.
            Error::QuotaExceeded { status: quota } => {
                let body = Json(json!({ "error": self.user_message() }));
                let mut response = (status, body).into_response();
                response.headers_mut().extend(quota.headers());
                response
            }
            Error::ContentRejected { reasons } => {
                let body = Json(json!({
                    "error": self.user_message(),
                    "reasons": reasons,
                }));
                (status, body).into_response()
            }
            _ => {
                let body = Json(json!({ "error": self.user_message() }));
                (status, body).into_response()
            }
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
