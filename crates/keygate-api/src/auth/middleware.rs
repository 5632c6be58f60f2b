/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header and resolves it
/// through the read-only token check. On success the token's claims are
/// added to request extensions.
use super::jwt::Claims;
use super::session::TokenLookup;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Authenticated identity extracted from a bearer token
///
/// Added to request extensions by the auth middleware and extracted in
/// handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Identity name (token subject)
    pub name: String,
    /// Token issue time (Unix seconds)
    pub issued_at: u64,
    /// Token expiry time (Unix seconds)
    pub expires_at: u64,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            name: claims.sub,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
fn bearer_token(request: &Request<Body>) -> Result<&str, AppError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Unauthorized),
    }
}

/// Authentication middleware that requires a valid bearer token
///
/// Missing or malformed headers yield 401 `UNAUTHORIZED`; expired or invalid
/// tokens yield 401 `TOKEN_EXPIRED` / `INVALID_TOKEN`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?.to_string();

    let claims = match state.auth.check_token(&TokenLookup::Token(token)).await {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(e.into());
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}
