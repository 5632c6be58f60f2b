//! User registration and authentication handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{AuthError, AuthenticatedUser, Claims, TokenLookup};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use keygate_core::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Credentials submitted for registration or login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CredentialsRequest {
    /// Unique user name (at most 100 characters)
    #[validate(length(max = 100))]
    #[schema(example = "alice")]
    pub name: String,

    /// Plaintext password
    #[schema(example = "secret")]
    pub password: String,
}

/// Token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Decoded token information
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenInfoResponse {
    /// Identity name (token subject)
    pub name: String,
    /// Issue time (Unix seconds)
    pub issued_at: u64,
    /// Expiry time (Unix seconds)
    pub expires_at: u64,
}

impl From<Claims> for TokenInfoResponse {
    fn from(claims: Claims) -> Self {
        Self {
            name: claims.sub,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

fn validate(request: &CredentialsRequest) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Register a new user
///
/// Hashes the password, stores the identity and returns its first token.
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User registered", body = TokenResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Username already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate(&request)?;

    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match state.auth.register(&request.name, &request.password).await {
        Ok((identity, token)) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: identity.id,
                name: identity.name,
                ip_address,
                user_agent,
            });
            Ok((StatusCode::CREATED, Json(TokenResponse { token })))
        }
        Err(e) => {
            audit_log(&AuditEvent::RegistrationFailure {
                name: request.name,
                reason: e.to_string(),
                ip_address,
                user_agent,
            });
            Err(e.into())
        }
    }
}

/// Authenticate with name and password
///
/// Returns the user's live token, reissuing it if the cached one expired.
#[utoipa::path(
    post,
    path = "/users/auth",
    tag = "users",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Authenticated", body = TokenResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 403, description = "Invalid username or password", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate(&request)?;

    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match state.auth.login(&request.name, &request.password).await {
        Ok((identity, token)) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: identity.id,
                name: identity.name,
                ip_address,
                user_agent,
            });
            Ok((StatusCode::CREATED, Json(TokenResponse { token })))
        }
        Err(e) => {
            let reason = match &e {
                AuthError::InvalidCredentials(rejection) => rejection.as_str().to_string(),
                other => other.to_string(),
            };
            audit_log(&AuditEvent::LoginFailure {
                name: request.name,
                reason,
                ip_address,
                user_agent,
            });
            Err(e.into())
        }
    }
}

/// Check the cached token of a user
#[utoipa::path(
    get,
    path = "/users/check_token/{user_id}",
    tag = "users",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Token is valid", body = TokenInfoResponse),
        (status = 400, description = "User id is not an integer", body = crate::error::ApiError),
        (status = 401, description = "Token expired or invalid", body = crate::error::ApiError),
        (status = 404, description = "Token not found", body = crate::error::ApiError),
    )
)]
pub async fn check_token_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<TokenInfoResponse>, AppError> {
    let Path(user_id) = path?;
    let claims = state
        .auth
        .check_token(&TokenLookup::UserId(user_id))
        .await?;

    Ok(Json(claims.into()))
}

/// Describe the bearer token of the current request
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Token is valid", body = AuthenticatedUser),
        (status = 401, description = "Missing, expired or invalid token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthenticatedUser> {
    Json(user)
}
