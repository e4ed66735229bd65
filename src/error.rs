//! Error types for the gear tracker server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;

static EXPOSE_DETAILS: OnceCell<bool> = OnceCell::new();

/// Enable internal error details in responses (development mode only).
/// Only the first call has an effect.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_DETAILS.set(enabled);
}

fn internal_details_exposed() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

/// Machine-readable error codes returned in the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    DuplicateName,
    InvalidReference,
    HasDependents,
    Unauthenticated,
    Forbidden,
    NotFound,
    InternalError,
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

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationErrors(Vec<String>),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Has dependents: {0}")]
    HasDependents(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::ValidationErrors(_)
            | AppError::DuplicateName(_)
            | AppError::InvalidReference(_)
            | AppError::HasDependents(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) => ErrorCode::Unauthenticated,
            AppError::Authorization(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) | AppError::ValidationErrors(_) => ErrorCode::ValidationError,
            AppError::DuplicateName(_) => ErrorCode::DuplicateName,
            AppError::InvalidReference(_) => ErrorCode::InvalidReference,
            AppError::HasDependents(_) => ErrorCode::HasDependents,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Internal detail, development mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let (message, errors, detail) = match self {
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::DuplicateName(msg)
            | AppError::InvalidReference(msg)
            | AppError::HasDependents(msg) => (msg, None, None),
            AppError::ValidationErrors(errors) => {
                ("Validation error".to_string(), Some(errors), None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error".to_string(), None, Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None, Some(msg))
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            code,
            message,
            errors,
            error: detail.filter(|_| internal_details_exposed()),
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationErrors(validation_messages(&errors))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("Invalid identifier: {}", rejection.body_text()))
    }
}

/// Flatten validator errors into human-readable messages, sorted by field
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect()
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
