//! Process-local token cache on moka

use async_trait::async_trait;
use keygate_core::{Result, TokenCache, UserId};
use moka::future::Cache;

/// Default capacity when none is configured
const DEFAULT_MAX_CAPACITY: u64 = 100_000;

/// In-memory token cache
///
/// Thread-safe and suitable for async contexts. Entries live until they are
/// overwritten, cleared or evicted for capacity.
#[derive(Clone)]
pub struct MemoryTokenCache {
    cache: Cache<UserId, String>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a cache bounded to `max_capacity` entries
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Get current cache size
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, user_id: UserId) -> Result<Option<String>> {
        Ok(self.cache.get(&user_id).await)
    }

    async fn set(&self, user_id: UserId, token: &str) -> Result<()> {
        self.cache.insert(user_id, token.to_string()).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        // Wait for all pending invalidations to complete
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
