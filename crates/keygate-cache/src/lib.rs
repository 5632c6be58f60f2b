//! Token cache backends
//!
//! Holds the most recently issued token for each identity, keyed by user id.
//! Two backends implement [`keygate_core::TokenCache`]:
//! - `MemoryTokenCache`: process-local moka cache
//! - `RedisTokenCache`: shared Redis instance, one key per identity
//!
//! Entries carry no TTL of their own. Expiry is decided by decoding the
//! cached token, never by eviction.
//!
//! Author: hephaex@gmail.com

pub mod memory;
pub mod redis_cache;

pub use memory::MemoryTokenCache;
pub use redis_cache::RedisTokenCache;

use keygate_core::{CacheBackend, CacheConfig, Result, TokenCache};
use std::sync::Arc;

/// Build the token cache selected by configuration
///
/// # Arguments
/// * `config` - Cache section of the application configuration
///
/// # Returns
/// A shared handle to the configured backend
pub async fn build_token_cache(config: &CacheConfig) -> Result<Arc<dyn TokenCache>> {
    let cache: Arc<dyn TokenCache> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryTokenCache::with_capacity(config.max_capacity)),
        CacheBackend::Redis => Arc::new(
            RedisTokenCache::connect(&config.redis_url, config.key_prefix.clone()).await?,
        ),
    };

    tracing::info!(backend = cache.name(), "Token cache initialized");
    Ok(cache)
}
