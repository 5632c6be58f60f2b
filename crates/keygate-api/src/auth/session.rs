//! Session token issuance
//!
//! Each identity has at most one live token, held in the token cache under
//! the identity's id. `obtain` hands out the cached token while it is valid
//! and replaces it once it has expired. `check` is read-only.

use super::jwt::{Claims, JwtError, TokenCodec};
use super::AuthError;
use crate::audit::{audit_log, AuditEvent};
use keygate_core::{Identity, TokenCache, UserDirectory, UserId};
use std::sync::Arc;

/// How a token to check is located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    /// A token presented directly, e.g. as a bearer credential
    Token(String),
    /// The cached token of an identity
    UserId(UserId),
}

/// Mints, caches and revalidates session tokens
#[derive(Clone)]
pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    cache: Arc<dyn TokenCache>,
    directory: Arc<dyn UserDirectory>,
}

impl SessionIssuer {
    pub fn new(
        codec: Arc<TokenCodec>,
        cache: Arc<dyn TokenCache>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            codec,
            cache,
            directory,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mint a fresh token and make it the identity's live token
    #[tracing::instrument(skip(self, identity), fields(user_id = identity.id))]
    pub async fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        let token = self.codec.encode(identity)?;
        self.cache.set(identity.id, &token).await?;
        Ok(token)
    }

    /// Return the identity's live token, minting one if needed
    ///
    /// Only expiry triggers reissue. Within the TTL repeated calls return
    /// byte-identical tokens.
    #[tracing::instrument(skip(self, identity), fields(user_id = identity.id))]
    pub async fn obtain(&self, identity: &Identity) -> Result<String, AuthError> {
        let Some(cached) = self.cache.get(identity.id).await? else {
            tracing::debug!("No cached token, issuing");
            return self.issue(identity).await;
        };

        match self.codec.decode(&cached) {
            Err(JwtError::ExpiredToken) => {
                let token = self.issue(identity).await?;
                audit_log(&AuditEvent::TokenReissued {
                    user_id: identity.id,
                    name: identity.name.clone(),
                });
                Ok(token)
            }
            // The cache only holds tokens minted here
            _ => Ok(cached),
        }
    }

    /// Validate a token without side effects
    ///
    /// # Returns
    ///
    /// * `Err(AuthError::TokenNotFound)` - unknown user id or no cached token
    /// * `Err(AuthError::ExpiredToken)` / `Err(AuthError::InvalidToken)` - from decoding
    #[tracing::instrument(skip(self, lookup))]
    pub async fn check(&self, lookup: &TokenLookup) -> Result<Claims, AuthError> {
        let token = match lookup {
            TokenLookup::Token(token) => token.clone(),
            TokenLookup::UserId(user_id) => {
                if self.directory.find_by_id(*user_id).await?.is_none() {
                    return Err(AuthError::TokenNotFound);
                }
                self.cache
                    .get(*user_id)
                    .await?
                    .ok_or(AuthError::TokenNotFound)?
            }
        };

        Ok(self.codec.decode(&token)?)
    }
}
