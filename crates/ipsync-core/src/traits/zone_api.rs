// # Zone API Trait
//
// Defines the interface to a DNS provider that manages records per zone.
//
// ## Implementations
//
// - TransIP REST API v6: `ipsync-provider-transip` crate
//
// ## Usage
//
// ```rust,ignore
// use ipsync_core::ZoneApi;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* ZoneApi implementation */;
//
//     let mut records = api.get_records("example.com").await?;
//     records[0].content = "203.0.113.7".to_string();
//     api.replace_records("example.com", &records[..1]).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Name used for the record on the zone apex
pub const APEX_NAME: &str = "@";

/// A single DNS record inside a zone
///
/// `name` is relative to the zone: `"@"` for the apex, otherwise the label
/// prefix (`"www"`, `"a.b"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsEntry {
    /// Record name relative to the zone
    pub name: String,

    /// Time-to-live in seconds
    #[serde(default)]
    pub expire: u32,

    /// Record type ("A", "AAAA", or anything else, passed through untouched)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Record value
    pub content: String,
}

impl DnsEntry {
    /// Create a new entry with the default TTL of 300 seconds
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expire: 300,
            record_type: record_type.into(),
            content: content.into(),
        }
    }

    /// Set the TTL
    pub fn with_expire(mut self, expire: u32) -> Self {
        self.expire = expire;
        self
    }
}

/// Trait for zone API implementations
///
/// # Contract
///
/// - `get_records` returns every record of the zone, in provider order.
/// - `replace_records` writes exactly the given entries and leaves every other
///   record of the zone as it is. It is only called with a non-empty subset.
/// - Implementations authenticate themselves and own their token cache.
/// - Implementations must not retry; the orchestrator retries on the next cycle.
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// Fetch all records of a zone
    ///
    /// # Parameters
    ///
    /// - `zone`: The root domain of the zone (e.g., "example.com")
    async fn get_records(&self, zone: &str) -> crate::Result<Vec<DnsEntry>>;

    /// Write the given records to a zone
    ///
    /// # Parameters
    ///
    /// - `zone`: The root domain of the zone
    /// - `entries`: The changed records, with their new content
    async fn replace_records(&self, zone: &str, entries: &[DnsEntry]) -> crate::Result<()>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_uses_provider_field_names() {
        let entry = DnsEntry::new("www", "A", "203.0.113.7").with_expire(60);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "www",
                "expire": 60,
                "type": "A",
                "content": "203.0.113.7",
            })
        );
    }

    #[test]
    fn missing_expire_defaults_to_zero() {
        let entry: DnsEntry =
            serde_json::from_str(r#"{"name":"@","type":"MX","content":"10 mail.example.com."}"#)
                .unwrap();
        assert_eq!(entry.expire, 0);
        assert_eq!(entry.record_type, "MX");
    }
}
