//! Error handling module for the Reading Circle backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_PHASE: &str = "INVALID_PHASE";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const PRECONDITION_FAILED: &str = "PRECONDITION_FAILED";
    pub const INVALID_ALLOCATION: &str = "INVALID_ALLOCATION";
    pub const INVALID_SELECTION: &str = "INVALID_SELECTION";
    pub const INVALID_STATE: &str = "INVALID_STATE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Authentication required or actor unknown
    Unauthorized(String),
    /// Actor lacks host/admin privilege for this operation
    Forbidden(String),
    /// Referenced meet, book, candidate, or date option does not exist
    NotFound(String),
    /// Malformed or out-of-bounds request fields
    Validation(String),
    /// Operation attempted while the meet is not in a permitting phase
    InvalidPhase(String),
    /// Requested phase change is not in the legal transition set
    InvalidTransition(String),
    /// Phase transition's extra requirements not met
    PreconditionFailed(String),
    /// Point-vote submission does not sum to the fixed budget
    InvalidAllocation(String),
    /// Book selection outside the allowed candidate/tie-break rules
    InvalidSelection(String),
    /// Action attempted before its prerequisite state is reached
    InvalidState(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidPhase(_)
            | AppError::InvalidTransition(_)
            | AppError::PreconditionFailed(_)
            | AppError::InvalidAllocation(_)
            | AppError::InvalidSelection(_)
            | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::InvalidPhase(_) => codes::INVALID_PHASE,
            AppError::InvalidTransition(_) => codes::INVALID_TRANSITION,
            AppError::PreconditionFailed(_) => codes::PRECONDITION_FAILED,
            AppError::InvalidAllocation(_) => codes::INVALID_ALLOCATION,
            AppError::InvalidSelection(_) => codes::INVALID_SELECTION,
            AppError::InvalidState(_) => codes::INVALID_STATE,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::InvalidPhase(msg)
            | AppError::InvalidTransition(msg)
            | AppError::PreconditionFailed(msg)
            | AppError::InvalidAllocation(msg)
            | AppError::InvalidSelection(msg)
            | AppError::InvalidState(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Validation(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
            revision_id,
        }
    }
}

/// Wrapper type for errors that carry revision_id context.
pub struct AppErrorWithRevision {
    pub error: AppError,
    pub revision_id: i64,
}

impl IntoResponse for AppErrorWithRevision {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorResponse::new(&self.error, self.revision_id);
        (status, Json(body)).into_response()
    }
}
