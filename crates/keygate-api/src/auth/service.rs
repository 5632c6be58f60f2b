//! Authentication service layer
//!
//! Provides the boundary operations for registration, login and token
//! checks. Integrates the user directory, password hashing and session
//! issuance.

use super::jwt::Claims;
use super::password::{hash_password, PasswordConfig};
use super::session::{SessionIssuer, TokenLookup};
use super::validator::CredentialValidator;
use super::AuthError;
use keygate_core::{Identity, NewIdentity, UserDirectory};
use std::sync::Arc;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    validator: CredentialValidator,
    sessions: SessionIssuer,
    password_config: PasswordConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        sessions: SessionIssuer,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            validator: CredentialValidator::new(directory.clone()),
            directory,
            sessions,
            password_config,
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Register a new identity and return its first token
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Freshly minted token, already cached
    /// * `Err(AuthError::DuplicateIdentity)` - the name is taken, whether
    ///   seen by the pre-check or by the directory's uniqueness constraint
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, name: &str, password: &str) -> Result<(Identity, String), AuthError> {
        self.validator.ensure_available(name).await?;

        let password_hash = hash_password(password, &self.password_config)?;
        let identity = self
            .directory
            .insert(NewIdentity::new(name, password_hash))
            .await?;

        let token = self.sessions.issue(&identity).await?;
        tracing::info!(user_id = identity.id, "Identity registered");

        Ok((identity, token))
    }

    /// Check a name and password pair
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<Identity, AuthError> {
        self.validator.authenticate(name, password).await
    }

    /// Return the identity's live token, reissuing it if expired
    pub async fn issue_or_reuse_token(&self, identity: &Identity) -> Result<String, AuthError> {
        self.sessions.obtain(identity).await
    }

    /// Authenticate then hand out the live token
    pub async fn login(&self, name: &str, password: &str) -> Result<(Identity, String), AuthError> {
        let identity = self.authenticate(name, password).await?;
        let token = self.issue_or_reuse_token(&identity).await?;
        Ok((identity, token))
    }

    /// Read-only token validation
    pub async fn check_token(&self, lookup: &TokenLookup) -> Result<Claims, AuthError> {
        self.sessions.check(lookup).await
    }
}
