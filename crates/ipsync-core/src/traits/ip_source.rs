// # IP Source Trait
//
// Defines the interface for discovering the machine's current public addresses.
//
// ## Implementations
//
// - HTTP plain-text endpoints (icanhazip): `ipsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ipsync_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let observed = source.current().await?;
//     println!("v4={} v6={}", observed.v4, observed.v6);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// The DNS record type that carries addresses of this family
    pub fn record_type(self) -> &'static str {
        match self {
            IpFamily::V4 => "A",
            IpFamily::V6 => "AAAA",
        }
    }

    /// Map a DNS record type to the family it carries, if any
    pub fn from_record_type(record_type: &str) -> Option<Self> {
        match record_type {
            "A" => Some(IpFamily::V4),
            "AAAA" => Some(IpFamily::V6),
            _ => None,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// The current public addresses of this machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedAddresses {
    /// Public IPv4 address
    pub v4: Ipv4Addr,
    /// Public IPv6 address
    pub v6: Ipv6Addr,
}

impl ObservedAddresses {
    pub fn new(v4: Ipv4Addr, v6: Ipv6Addr) -> Self {
        Self { v4, v6 }
    }

    /// The observed address for the given family
    pub fn for_family(&self, family: IpFamily) -> IpAddr {
        match family {
            IpFamily::V4 => IpAddr::V4(self.v4),
            IpFamily::V6 => IpAddr::V6(self.v6),
        }
    }

    /// Whether `content` already holds the observed address of `family`
    ///
    /// Content that does not parse as an address of that family never matches.
    pub fn matches(&self, family: IpFamily, content: &str) -> bool {
        match family {
            IpFamily::V4 => content.parse::<Ipv4Addr>().is_ok_and(|ip| ip == self.v4),
            IpFamily::V6 => content.parse::<Ipv6Addr>().is_ok_and(|ip| ip == self.v6),
        }
    }
}

/// Parse an address returned by `source` and check that it has the expected family
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) count as IPv4 form and are
/// rejected when an IPv6 address is expected.
pub fn parse_address(raw: &str, family: IpFamily, source: &str) -> crate::Result<IpAddr> {
    let text = raw.trim();
    let ip: IpAddr = text.parse().map_err(|_| {
        crate::Error::ip_source(format!("invalid {} address from {}: {:?}", family, source, text))
    })?;

    match (family, ip) {
        (IpFamily::V4, IpAddr::V4(_)) => Ok(ip),
        (IpFamily::V4, IpAddr::V6(v6)) => v6.to_ipv4_mapped().map(IpAddr::V4).ok_or_else(|| {
            crate::Error::ip_source(format!("{} did not return an IPv4 address: {}", source, ip))
        }),
        (IpFamily::V6, IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_none() => Ok(ip),
        (IpFamily::V6, _) => Err(crate::Error::ip_source(format!(
            "{} did not return an IPv6 address: {}",
            source, ip
        ))),
    }
}

/// Trait for IP source implementations
///
/// # Behavior
///
/// - Both families are fetched on every call; a failure of either fails the call.
/// - Implementations must not cache: every sync cycle evaluates from scratch.
/// - Implementations must not retry; the next scheduled cycle is the retry.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public IPv4 and IPv6 addresses
    ///
    /// # Returns
    ///
    /// - `Ok(ObservedAddresses)`: Both addresses, validated for family
    /// - `Err(Error)`: If either fetch failed or returned the wrong family
    async fn current(&self) -> crate::Result<ObservedAddresses>;

    /// Name of this source (for logging)
    fn source_name(&self) -> &'static str;
}
