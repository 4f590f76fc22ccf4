// # Memory Token Cache
//
// In-memory implementation of TokenCache.
//
// ## Crash Behavior
//
// - All tokens are lost on restart
// - The first zone API call after a restart authenticates again
//
// Tokens are short-lived, so nothing is gained by persisting them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::Error;
use crate::traits::token_cache::{AuthToken, TokenCache};

/// In-memory token cache
///
/// Tokens are kept in a HashMap behind a mutex. Cloning the cache shares the
/// underlying map.
///
/// # Example
///
/// ```rust,no_run
/// use ipsync_core::cache::MemoryTokenCache;
/// use ipsync_core::traits::{AuthToken, TokenCache};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = MemoryTokenCache::new();
///
///     assert!(cache.get("account").await?.is_none());
///
///     let token = AuthToken::new("raw-token", chrono::Utc::now());
///     cache.set("account", token.clone()).await?;
///     assert_eq!(cache.get("account").await?, Some(token));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenCache {
    inner: Arc<Mutex<HashMap<String, AuthToken>>>,
}

impl MemoryTokenCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of cached tokens
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<AuthToken>, Error> {
        let guard = self.inner.lock().await;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, token: AuthToken) -> Result<(), Error> {
        let mut guard = self.inner.lock().await;
        guard.insert(key.to_string(), token);
        Ok(())
    }
}
