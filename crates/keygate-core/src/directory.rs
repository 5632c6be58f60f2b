//! User directory stores
//!
//! Provides identity persistence behind the [`UserDirectory`] trait:
//! - `PgUserDirectory` backed by PostgreSQL through SQLx
//! - `MemoryUserDirectory` for single-process deployments and tests

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::{Identity, KeygateError, NewIdentity, Result, UserDirectory, UserId};

/// Schema of the identity table
const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
)
"#;

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL user directory
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new directory connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                KeygateError::DatabaseError(format!("PostgreSQL connection failed: {e}"))
            })?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the identity table if it does not exist
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| KeygateError::DatabaseError(format!("Migration failed: {e}")))?;

        tracing::info!("users table is up to date");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<Identity>> {
        sqlx::query_as::<_, Identity>(
            "SELECT id, name, password_hash FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KeygateError::DatabaseError(format!("Failed to fetch user: {e}")))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>> {
        sqlx::query_as::<_, Identity>("SELECT id, name, password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KeygateError::DatabaseError(format!("Failed to fetch user: {e}")))
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity> {
        let result = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO users (name, password_hash)
            VALUES ($1, $2)
            RETURNING id, name, password_hash
            "#,
        )
        .bind(&identity.name)
        .bind(&identity.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            // A concurrent registration won the race for this name
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(KeygateError::DuplicateIdentity(identity.name))
            }
            Err(e) => Err(KeygateError::DatabaseError(format!(
                "Failed to create user: {e}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Default)]
struct MemoryState {
    next_id: UserId,
    by_id: BTreeMap<UserId, Identity>,
    ids_by_name: HashMap<String, UserId>,
}

/// Process-local user directory
///
/// The uniqueness check and the insert happen under one write lock, so
/// concurrent registrations of the same name cannot both succeed.
#[derive(Default)]
pub struct MemoryUserDirectory {
    state: RwLock<MemoryState>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities
    pub async fn len(&self) -> usize {
        self.state.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<Identity>> {
        let state = self.state.read().await;
        Ok(state
            .ids_by_name
            .get(name)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>> {
        Ok(self.state.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity> {
        let mut state = self.state.write().await;

        if state.ids_by_name.contains_key(&identity.name) {
            return Err(KeygateError::DuplicateIdentity(identity.name));
        }

        state.next_id += 1;
        let created = Identity {
            id: state.next_id,
            name: identity.name,
            password_hash: identity.password_hash,
        };
        state.ids_by_name.insert(created.name.clone(), created.id);
        state.by_id.insert(created.id, created.clone());

        Ok(created)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
