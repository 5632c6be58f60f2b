//! Authentication core
//!
//! This module provides the credential and session token lifecycle:
//! - Password hashing with Argon2id
//! - Token encoding and validation (asymmetric JWT)
//! - Credential validation against the user directory
//! - Session issuance with reuse-or-reissue over the token cache
//! - Middleware resolving bearer tokens on protected routes

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;
pub mod validator;

pub use jwt::{parse_algorithm, Claims, JwtError, TokenCodec};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordConfig, PasswordError};
pub use service::AuthService;
pub use session::{SessionIssuer, TokenLookup};
pub use validator::CredentialValidator;

use keygate_core::KeygateError;
use thiserror::Error;

/// Why a login attempt was rejected
///
/// Kept for audit logs only. Both reasons render the same message so
/// callers cannot probe which names exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoSuchUser,
    WrongPassword,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NoSuchUser => "no_such_user",
            Rejection::WrongPassword => "wrong_password",
        }
    }
}

/// Outcomes of the authentication core
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already exists: {0}")]
    DuplicateIdentity(String),

    #[error("Invalid username or password")]
    InvalidCredentials(Rejection),

    #[error("Token not found")]
    TokenNotFound,

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<KeygateError> for AuthError {
    fn from(err: KeygateError) -> Self {
        match err {
            KeygateError::DuplicateIdentity(name) => AuthError::DuplicateIdentity(name),
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::ExpiredToken => AuthError::ExpiredToken,
            JwtError::InvalidToken => AuthError::InvalidToken,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
