//! Error handling for the Scrap Link backend
//!
//! Every failure surfaces to the acting user as `{ "error": { code, message, field? } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::external::PredictionError;
use crate::gateway::GatewayError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Session errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Session is still loading")]
    SessionLoading,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // External collaborator errors
    #[error("Persistence error: {0}")]
    Persistence(GatewayError),

    #[error("Price prediction error: {0}")]
    Prediction(#[from] PredictionError),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn conflict(resource: &str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            resource: resource.to_string(),
            message: message.into(),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(what) => AppError::NotFound(what.to_string()),
            GatewayError::Conflict { resource, message } => AppError::Conflict { resource, message },
            other => AppError::Persistence(other),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));

        AppError::Validation { field, message }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl AppError {
    /// HTTP status and client-facing detail for this error
    pub fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid email or password"),
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorDetail::new("UNAUTHORIZED", msg.clone()))
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorDetail::new("FORBIDDEN", msg.clone()))
            }
            AppError::SessionLoading => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new("SESSION_LOADING", "Session is still being resolved"),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message: message.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::Persistence(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("PERSISTENCE_ERROR", "The data store could not complete the request"),
            ),
            AppError::Prediction(err) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "PREDICTION_ERROR",
                    format!("Price prediction unavailable, enter a price manually: {}", err),
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
