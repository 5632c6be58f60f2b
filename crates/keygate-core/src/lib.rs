//! Keygate Core - Identity records, collaborator traits, and shared types
//!
//! This crate defines the abstractions the authentication core is built on:
//! - Identity records owned by the user directory
//! - Collaborator traits (user directory, token cache, photo publisher)
//! - Common error types
//! - Time source used for token issuance and expiry
//! - Configuration management

pub mod clock;
pub mod config;
pub mod directory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, CacheBackend, CacheConfig, ConfigError, DatabaseConfig, JwtSettings,
    LoggingConfig, PasswordSettings, PhotoConfig, ServerConfig, StoreBackend,
};
pub use directory::{MemoryUserDirectory, PgUserDirectory};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for collaborator operations
#[derive(Error, Debug)]
pub enum KeygateError {
    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Publish error: {0}")]
    PublishError(String),
}

pub type Result<T> = std::result::Result<T, KeygateError>;

// ============================================================================
// Identity
// ============================================================================

/// Stable key of a persisted identity
pub type UserId = i64;

/// A stored credential record
///
/// Created on registration and never updated afterwards. The password hash
/// is skipped by serde and redacted from `Debug` output so it cannot leak
/// into responses or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    /// Primary key assigned by the directory
    pub id: UserId,

    /// Unique, case-sensitive user name
    pub name: String,

    /// Argon2id PHC string, never the plaintext
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// An identity that has not been persisted yet (no id assigned)
#[derive(Clone)]
pub struct NewIdentity {
    pub name: String,
    pub password_hash: String,
}

impl NewIdentity {
    pub fn new(name: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password_hash: password_hash.into(),
        }
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Persistent store of identity records
///
/// Implementations must enforce name uniqueness atomically: of two
/// concurrent inserts with the same name exactly one succeeds and the other
/// fails with [`KeygateError::DuplicateIdentity`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Exact, case-sensitive lookup by name
    async fn find_by_name(&self, name: &str) -> Result<Option<Identity>>;

    /// Lookup by primary key
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>>;

    /// Insert a new identity and return it with its assigned id
    async fn insert(&self, identity: NewIdentity) -> Result<Identity>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Key-value store holding the most recently issued token per identity
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Get the cached token for an identity
    async fn get(&self, user_id: UserId) -> Result<Option<String>>;

    /// Store (overwrite) the token for an identity
    async fn set(&self, user_id: UserId, token: &str) -> Result<()>;

    /// Remove every cached token
    async fn clear(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Downstream message-queue publisher for verification photos
#[async_trait]
pub trait PhotoPublisher: Send + Sync {
    /// Publish a payload to a topic
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()>;

    /// Publisher name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
