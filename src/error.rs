//! Error types for the Lendshelf server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    lending::{LoanError, LoanErrorKind},
    models::RecordError,
};

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    Forbidden = 3,
    DbFailure = 4,
    NotFound = 5,
    BadValue = 6,
    InvalidState = 10,
    NotAuthorized = 11,
    NotAvailable = 12,
    InvalidDateRange = 13,
    SelfLoan = 14,
    CopyNoLongerAvailable = 15,
}

impl From<LoanErrorKind> for ErrorCode {
    fn from(kind: LoanErrorKind) -> Self {
        match kind {
            LoanErrorKind::InvalidState => ErrorCode::InvalidState,
            LoanErrorKind::NotAuthorized => ErrorCode::NotAuthorized,
            LoanErrorKind::NotAvailable => ErrorCode::NotAvailable,
            LoanErrorKind::InvalidDateRange => ErrorCode::InvalidDateRange,
            LoanErrorKind::SelfLoan => ErrorCode::SelfLoan,
            LoanErrorKind::CopyNoLongerAvailable => ErrorCode::CopyNoLongerAvailable,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Loan(#[from] LoanError),
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

fn loan_status(kind: LoanErrorKind) -> StatusCode {
    match kind {
        LoanErrorKind::InvalidState => StatusCode::CONFLICT,
        LoanErrorKind::NotAuthorized => StatusCode::FORBIDDEN,
        LoanErrorKind::NotAvailable => StatusCode::CONFLICT,
        LoanErrorKind::InvalidDateRange => StatusCode::BAD_REQUEST,
        LoanErrorKind::SelfLoan => StatusCode::BAD_REQUEST,
        LoanErrorKind::CopyNoLongerAvailable => StatusCode::CONFLICT,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Loan(e) => {
                let kind = e.kind();
                (loan_status(kind), ErrorCode::from(kind), e.to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
