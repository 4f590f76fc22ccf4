// # Token Cache Trait
//
// Defines the interface for caching provider authentication tokens.
//
// ## Purpose
//
// Zone API clients authenticate with a signed request that returns a bearer
// token valid for a limited time. The cache lets every zone API call within
// that window reuse the same token instead of authenticating again.
//
// ## Implementations
//
// - In-memory: `ipsync_core::cache::MemoryTokenCache`

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// A bearer token and the moment it stops being accepted
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// The raw token, sent as `Authorization: Bearer <raw>`
    /// ⚠️ NEVER log this value
    pub raw: String,

    /// Expiry time reported by the provider
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(raw: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            raw: raw.into(),
            expires_at,
        }
    }

    /// Whether the token expires within `leeway` from now
    pub fn expires_within(&self, leeway: Duration) -> bool {
        Utc::now() + leeway >= self.expires_at
    }
}

// Custom Debug implementation that hides the token
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("raw", &"<REDACTED>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Trait for token cache implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Get the cached token for `key`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(AuthToken))`: A token was cached (it may be expired)
    /// - `Ok(None)`: Nothing cached for this key; absence is not an error
    /// - `Err(Error)`: Cache backend failure
    async fn get(&self, key: &str) -> crate::Result<Option<AuthToken>>;

    /// Store `token` under `key`, replacing any previous token
    async fn set(&self, key: &str, token: AuthToken) -> crate::Result<()>;
}
