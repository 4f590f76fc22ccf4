//! Configuration types for the IP syncer
//!
//! The configuration is a YAML file:
//!
//! ```yaml
//! sync_interval: 300
//! account:
//!   name: my-account
//!   private_key_path: /etc/ipsync/private.key
//! domains:
//!   - example.com
//!   - www.example.com
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// File name of the private key looked up next to the configuration file
pub const DEFAULT_PRIVATE_KEY_FILE: &str = "private.key";

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between sync cycles
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u64,

    /// Provider account
    pub account: AccountConfig,

    /// Domains to keep in sync, in processing order
    pub domains: Vec<String>,

    /// Endpoint returning the public IPv4 address as plain text
    #[serde(default)]
    pub ip_source_url_v4: Option<String>,

    /// Endpoint returning the public IPv6 address as plain text
    #[serde(default)]
    pub ip_source_url_v6: Option<String>,

    /// Read zones but never write records
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the account and domains
    pub fn new(account_name: impl Into<String>, domains: Vec<String>) -> Self {
        Self {
            sync_interval: default_sync_interval(),
            account: AccountConfig {
                name: account_name.into(),
                private_key_path: None,
                whitelisted_only: false,
            },
            domains,
            ip_source_url_v4: None,
            ip_source_url_v6: None,
            dry_run: false,
        }
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration file and resolve the private key path
    ///
    /// The key path is, in order of preference: `key_override`, the
    /// `account.private_key_path` value, or `private.key` next to the file.
    pub fn load(path: &Path, key_override: Option<PathBuf>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("error reading config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_yaml_str(&text).map_err(|e| {
            Error::config(format!("error parsing config file {}: {}", path.display(), e))
        })?;
        config.account.private_key_path =
            Some(config.account.resolve_private_key_path(path, key_override));

        Ok(config)
    }

    /// The sync interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval == 0 {
            return Err(Error::config("sync_interval must be > 0"));
        }

        if self.account.name.trim().is_empty() {
            return Err(Error::config("account.name cannot be empty"));
        }

        if self.domains.is_empty() {
            return Err(Error::config("No domains configured"));
        }

        for domain in &self.domains {
            validate_domain_name(domain)?;
        }

        for (key, url) in [
            ("ip_source_url_v4", &self.ip_source_url_v4),
            ("ip_source_url_v6", &self.ip_source_url_v6),
        ] {
            if let Some(url) = url {
                parse_source_url(url)
                    .map_err(|e| Error::config(format!("{}: {}", key, e)))?;
            }
        }

        Ok(())
    }
}

/// Provider account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account (login) name
    pub name: String,

    /// Path to the PEM private key used to sign authentication requests
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Request tokens usable only from whitelisted IP addresses
    #[serde(default)]
    pub whitelisted_only: bool,
}

impl AccountConfig {
    /// Resolve the private key path for a config loaded from `config_path`
    pub fn resolve_private_key_path(
        &self,
        config_path: &Path,
        key_override: Option<PathBuf>,
    ) -> PathBuf {
        key_override
            .or_else(|| self.private_key_path.clone())
            .unwrap_or_else(|| {
                config_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(DEFAULT_PRIVATE_KEY_FILE)
            })
    }
}

/// Label accepted in first position for wildcard records (`*.example.com`)
pub const WILDCARD_LABEL: &str = "*";

/// Validate that a string is a plausible domain name
///
/// Basic RFC 1035 checks only, plus a leading `*` label for wildcard records.
/// Single-label names pass: they are skipped at sync time because no zone
/// can own them.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for (index, label) in domain.split('.').enumerate() {
        if index == 0 && label == WILDCARD_LABEL {
            continue;
        }

        if label.is_empty() {
            return Err(Error::config(format!("Domain name has empty label: '{}'", domain)));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Parse an IP source endpoint
///
/// Only absolute `http://` and `https://` URLs with a host are accepted.
pub fn parse_source_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::config(format!("Invalid IP source URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::config(format!(
            "IP source URL must be an absolute http(s) URL. Got: {}",
            raw
        )));
    }

    Ok(url)
}

fn default_sync_interval() -> u64 {
    300
}
