//! Redis-backed token cache
//!
//! Each identity owns one string key, `{prefix}{user_id}`, holding the
//! latest token. Keys are written without expiry.

use async_trait::async_trait;
use keygate_core::{KeygateError, Result, TokenCache, UserId};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Token cache on a shared Redis instance
#[derive(Clone)]
pub struct RedisTokenCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisTokenCache {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `url` - Redis connection URL, e.g. `redis://localhost:6379/0`
    /// * `key_prefix` - Prefix prepended to every user id
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| KeygateError::CacheError(format!("Invalid Redis URL: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| KeygateError::CacheError(format!("Redis connection failed: {e}")))?;

        Ok(Self::from_connection(conn, key_prefix))
    }

    /// Wrap an existing connection manager
    pub fn from_connection(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, user_id: UserId) -> String {
        cache_key(&self.key_prefix, user_id)
    }
}

fn cache_key(prefix: &str, user_id: UserId) -> String {
    format!("{prefix}{user_id}")
}

fn cache_error(op: &str, e: redis::RedisError) -> KeygateError {
    KeygateError::CacheError(format!("Redis {op} failed: {e}"))
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get(&self, user_id: UserId) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let token: Option<String> = conn
            .get(self.key(user_id))
            .await
            .map_err(|e| cache_error("GET", e))?;

        Ok(token)
    }

    async fn set(&self, user_id: UserId, token: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.key(user_id), token)
            .await
            .map_err(|e| cache_error("SET", e))?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .keys(format!("{}*", self.key_prefix))
            .await
            .map_err(|e| cache_error("KEYS", e))?;

        if !keys.is_empty() {
            let removed: usize = conn.del(&keys).await.map_err(|e| cache_error("DEL", e))?;
            tracing::debug!(removed, "Cleared cached tokens");
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}
