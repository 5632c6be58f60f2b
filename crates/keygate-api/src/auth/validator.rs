//! Credential validation
//!
//! Decides whether a `(name, password)` pair belongs to a stored identity.

use super::password::verify_password;
use super::{AuthError, Rejection};
use keygate_core::{Identity, UserDirectory};
use std::sync::Arc;

/// Validates login attempts against the user directory
#[derive(Clone)]
pub struct CredentialValidator {
    directory: Arc<dyn UserDirectory>,
}

impl CredentialValidator {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Accept or reject a login attempt
    ///
    /// # Returns
    ///
    /// * `Ok(Identity)` - the name exists and the password matches
    /// * `Err(AuthError::InvalidCredentials)` - unknown name or wrong password,
    ///   indistinguishable to the caller
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(identity) = self.directory.find_by_name(name).await? else {
            return Err(AuthError::InvalidCredentials(Rejection::NoSuchUser));
        };

        if !verify_password(password, &identity.password_hash) {
            return Err(AuthError::InvalidCredentials(Rejection::WrongPassword));
        }

        Ok(identity)
    }

    /// Registration pre-check, run before any hashing work
    ///
    /// Fails with `DuplicateIdentity` when the name is already taken. The
    /// directory insert still enforces uniqueness for concurrent requests.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_available(&self, name: &str) -> Result<(), AuthError> {
        match self.directory.find_by_name(name).await? {
            Some(_) => Err(AuthError::DuplicateIdentity(name.to_string())),
            None => Ok(()),
        }
    }
}
