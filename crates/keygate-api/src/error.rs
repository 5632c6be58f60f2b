//! API error handling
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthError;
use crate::photo::PhotoError;
use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keygate_core::KeygateError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Authentication required")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Outcome of the authentication core
    Auth(AuthError),
    BadRequest(String),
    /// Missing or malformed bearer credentials
    Unauthorized,
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::DuplicateIdentity(_)) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::InvalidCredentials(_)) => StatusCode::FORBIDDEN,
            AppError::Auth(AuthError::TokenNotFound) => StatusCode::NOT_FOUND,
            AppError::Auth(AuthError::ExpiredToken | AuthError::InvalidToken) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Auth(AuthError::Internal(_)) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::Auth(AuthError::DuplicateIdentity(_)) => {
                ApiError::new("CONFLICT", "Username already exists")
            }
            AppError::Auth(AuthError::InvalidCredentials(_)) => {
                ApiError::new("FORBIDDEN", "Invalid username or password")
            }
            AppError::Auth(AuthError::TokenNotFound) => ApiError::new("NOT_FOUND", "Token not found"),
            AppError::Auth(AuthError::ExpiredToken) => ApiError::new("TOKEN_EXPIRED", "token expired"),
            AppError::Auth(AuthError::InvalidToken) => ApiError::new("INVALID_TOKEN", "invalid token"),
            AppError::Auth(AuthError::Internal(msg)) | AppError::Internal(msg) => {
                // Collaborator details stay in the logs
                tracing::error!(error = %msg, "Request failed");
                ApiError::internal_error()
            }
            AppError::BadRequest(msg) => ApiError::bad_request("Invalid request").with_details(msg),
            AppError::Unauthorized => ApiError::unauthorized(),
        };

        (status, Json(error)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<KeygateError> for AppError {
    fn from(err: KeygateError) -> Self {
        AppError::Auth(err.into())
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::InvalidFileName(_) => AppError::BadRequest(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
