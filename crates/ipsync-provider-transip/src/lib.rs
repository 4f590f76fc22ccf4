// # TransIP Zone Provider
//
// This crate implements `ZoneApi` on top of the TransIP REST API v6.
//
// ## Behavior
//
// - Authenticates with a signed `POST /auth` and caches the bearer token
//   per account until shortly before it expires
// - Reads a zone with `GET /domains/{zone}/dns`
// - Writes each changed entry with its own `PATCH /domains/{zone}/dns`, so
//   records outside the changed subset are never touched
// - Dry-run mode performs every read and logs the writes it would make
// - No retries: the sync engine's next cycle is the retry
//
// ## Security
//
// - The private key and the bearer token NEVER appear in logs
// - A key that cannot be loaded fails construction, and with it startup
//
// ## API Reference
//
// - Authentication: POST `/auth`
// - List DNS entries: GET `/domains/:domain/dns`
// - Update one DNS entry: PATCH `/domains/:domain/dns`

mod auth;

pub use auth::{RequestSigner, TOKEN_EXPIRATION, jwt_expiry};

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ipsync_core::traits::{AuthToken, DnsEntry, TokenCache, ZoneApi};
use ipsync_core::{Error, Result};

use auth::{AuthRequest, AuthResponse, TOKEN_LIFETIME_SECS};

/// TransIP API base URL
pub const TRANSIP_API_BASE: &str = "https://api.transip.nl/v6";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cached tokens are replaced this long before they expire
const TOKEN_REFRESH_LEEWAY_SECS: i64 = 60;

const PROVIDER: &str = "transip";

#[derive(Deserialize)]
struct DnsEntriesResponse {
    #[serde(rename = "dnsEntries")]
    dns_entries: Vec<DnsEntry>,
}

#[derive(Serialize)]
struct DnsEntryRequest<'a> {
    #[serde(rename = "dnsEntry")]
    dns_entry: &'a DnsEntry,
}

/// TransIP zone API client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Authenticate and read zones as usual
/// - Log every entry it would write
/// - **NOT** send any PATCH request
pub struct TransipClient {
    /// Account (login) name, also the token cache key
    account_name: String,

    /// Signs authentication requests
    /// ⚠️ NEVER log this value
    signer: RequestSigner,

    /// Where bearer tokens are kept between calls
    token_cache: Arc<dyn TokenCache>,

    /// Serializes token refreshes so concurrent calls authenticate once
    refresh_lock: tokio::sync::Mutex<()>,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Request tokens usable only from whitelisted addresses
    whitelisted_only: bool,

    /// Dry-run mode: read zones, skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the key and tokens
impl fmt::Debug for TransipClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransipClient")
            .field("account_name", &self.account_name)
            .field("signer", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("whitelisted_only", &self.whitelisted_only)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl TransipClient {
    /// Create a new TransIP client
    ///
    /// # Parameters
    ///
    /// - `account_name`: TransIP login name
    /// - `private_key_pem`: PEM encoded RSA private key of the account
    /// - `token_cache`: Cache for bearer tokens, keyed by account name
    pub fn new(
        account_name: impl Into<String>,
        private_key_pem: &[u8],
        token_cache: Arc<dyn TokenCache>,
    ) -> Result<Self> {
        let account_name = account_name.into();
        if account_name.trim().is_empty() {
            return Err(Error::config("TransIP account name cannot be empty"));
        }

        let signer = RequestSigner::from_pem(private_key_pem)?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            account_name,
            signer,
            token_cache,
            refresh_lock: tokio::sync::Mutex::new(()),
            api_base: TRANSIP_API_BASE.to_string(),
            client,
            whitelisted_only: false,
            dry_run: false,
        })
    }

    /// Create a client with the private key read from `key_path`
    pub fn from_key_file(
        account_name: impl Into<String>,
        key_path: &Path,
        token_cache: Arc<dyn TokenCache>,
    ) -> Result<Self> {
        let pem = std::fs::read(key_path).map_err(|e| {
            Error::config(format!(
                "Failed to read private key {}: {}",
                key_path.display(),
                e
            ))
        })?;

        Self::new(account_name, &pem, token_cache)
    }

    /// Use another API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Request tokens usable only from whitelisted addresses
    pub fn with_whitelisted_only(mut self, whitelisted_only: bool) -> Self {
        self.whitelisted_only = whitelisted_only;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// A bearer token that is valid for at least another minute
    ///
    /// Served from the cache when possible, otherwise a new one is requested
    /// and stored.
    async fn token(&self) -> Result<String> {
        let leeway = chrono::Duration::seconds(TOKEN_REFRESH_LEEWAY_SECS);

        if let Some(token) = self.token_cache.get(&self.account_name).await? {
            if !token.expires_within(leeway) {
                return Ok(token.raw);
            }
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another call may have refreshed while we waited
        if let Some(token) = self.token_cache.get(&self.account_name).await? {
            if !token.expires_within(leeway) {
                return Ok(token.raw);
            }
        }

        let token = self.authenticate().await?;
        let raw = token.raw.clone();
        self.token_cache.set(&self.account_name, token).await?;

        Ok(raw)
    }

    /// Request a new bearer token
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /auth
    /// Signature: <base64 RSA-SHA512 signature of the body>
    /// {"login": "...", "nonce": "...", "read_only": false,
    ///  "expiration_time": "30 minutes", "label": "...", "global_key": true}
    /// ```
    async fn authenticate(&self) -> Result<AuthToken> {
        let requested_at = Utc::now();
        let request = AuthRequest {
            login: &self.account_name,
            nonce: self.signer.nonce()?,
            read_only: false,
            expiration_time: TOKEN_EXPIRATION,
            label: format!("ipsync-{}", requested_at.timestamp_micros()),
            global_key: !self.whitelisted_only,
        };

        let body = serde_json::to_vec(&request)?;
        let signature = self.signer.sign(&body)?;

        debug!("Requesting TransIP token for account {}", self.account_name);

        let response = self
            .client
            .post(format!("{}/auth", self.api_base))
            .header("Content-Type", "application/json")
            .header("Signature", signature)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("TransIP auth request failed: {}", e)))?;

        let response = check_status(response, "authenticate").await?;
        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| Error::zone_api(format!("Malformed TransIP auth response: {}", e)))?;

        let expires_at = jwt_expiry(&auth.token)
            .unwrap_or(requested_at + chrono::Duration::seconds(TOKEN_LIFETIME_SECS));
        debug!("TransIP token valid until {}", expires_at);

        Ok(AuthToken::new(auth.token, expires_at))
    }

    fn dns_url(&self, zone: &str) -> String {
        format!("{}/domains/{}/dns", self.api_base, zone)
    }
}

#[async_trait]
impl ZoneApi for TransipClient {
    /// Fetch all DNS entries of a zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /domains/:domain/dns
    /// Authorization: Bearer <token>
    /// ```
    async fn get_records(&self, zone: &str) -> Result<Vec<DnsEntry>> {
        let token = self.token().await?;

        let response = self
            .client
            .get(self.dns_url(zone))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::http(format!("TransIP request failed: {}", e)))?;

        let response = check_status(response, zone).await?;
        let entries: DnsEntriesResponse = response.json().await.map_err(|e| {
            Error::zone_api(format!("Malformed DNS entries of {}: {}", zone, e))
        })?;

        debug!(
            "Fetched {} DNS entries of {}",
            entries.dns_entries.len(),
            zone
        );
        Ok(entries.dns_entries)
    }

    /// Write the given entries, one PATCH per entry
    ///
    /// TransIP matches each PATCHed entry on name, type and expire and only
    /// replaces its content. Stops at the first failed write.
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /domains/:domain/dns
    /// Authorization: Bearer <token>
    /// {"dnsEntry": {"name": "www", "expire": 300, "type": "A", "content": "1.2.3.4"}}
    /// ```
    async fn replace_records(&self, zone: &str, entries: &[DnsEntry]) -> Result<()> {
        if self.dry_run {
            for entry in entries {
                info!(
                    "[DRY-RUN] Would set {} record '{}' in {} to {}",
                    entry.record_type, entry.name, zone, entry.content
                );
            }
            return Ok(());
        }

        let token = self.token().await?;

        for entry in entries {
            let response = self
                .client
                .patch(self.dns_url(zone))
                .bearer_auth(&token)
                .json(&DnsEntryRequest { dns_entry: entry })
                .send()
                .await
                .map_err(|e| Error::http(format!("TransIP request failed: {}", e)))?;

            check_status(response, zone).await?;
            debug!(
                "Set {} record '{}' in {} to {}",
                entry.record_type, entry.name, zone, entry.content
            );
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Map a non-success response to an error
///
/// `context` names what was being accessed (a zone, or the auth endpoint).
async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // TransIP explains failures as {"error": "..."}
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => Err(Error::auth(format!(
            "TransIP rejected the credentials ({}): {}",
            status, error_text
        ))),
        404 => Err(Error::not_found(format!(
            "{} ({}): {}",
            context, status, error_text
        ))),
        409 => Err(Error::provider(
            PROVIDER,
            format!("Conflict on {}: {}", context, error_text),
        )),
        429 => {
            warn!("TransIP rate limit hit on {}", context);
            Err(Error::rate_limited(format!(
                "TransIP rate limit exceeded on {}",
                context
            )))
        }
        500..=599 => Err(Error::provider(
            PROVIDER,
            format!("TransIP server error (transient) on {}: {} - {}", context, status, error_text),
        )),
        _ => Err(Error::provider(
            PROVIDER,
            format!("Request on {} failed: {} - {}", context, status, error_text),
        )),
    }
}
