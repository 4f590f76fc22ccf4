// # HTTP IP Source
//
// This crate provides the IP source used by the syncer: two plain-text HTTP
// endpoints, one answering with the caller's public IPv4 address and one with
// its public IPv6 address (icanhazip style).
//
// ## Behavior
//
// - Both endpoints are queried on every call, IPv4 first
// - The body is trimmed and parsed; the family must match the endpoint
// - Nothing is cached and nothing is retried: the next sync cycle is the retry

use ipsync_core::config::parse_source_url;
use ipsync_core::traits::{IpFamily, IpSource, ObservedAddresses, parse_address};
use ipsync_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;
use tracing::debug;

/// Default endpoint returning the public IPv4 address
pub const DEFAULT_IPV4_URL: &str = "https://ipv4.icanhazip.com/";

/// Default endpoint returning the public IPv6 address
pub const DEFAULT_IPV6_URL: &str = "https://ipv6.icanhazip.com/";

/// Per-request timeout
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP-based IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// Endpoint for the IPv4 address
    v4_url: Url,

    /// Endpoint for the IPv6 address
    v6_url: Url,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `v4_url`: IPv4 endpoint, `None` for [`DEFAULT_IPV4_URL`]
    /// - `v6_url`: IPv6 endpoint, `None` for [`DEFAULT_IPV6_URL`]
    pub fn new(v4_url: Option<&str>, v6_url: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            v4_url: parse_source_url(v4_url.unwrap_or(DEFAULT_IPV4_URL))?,
            v6_url: parse_source_url(v6_url.unwrap_or(DEFAULT_IPV6_URL))?,
            client,
        })
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The endpoint queried for `family`
    pub fn url(&self, family: IpFamily) -> &Url {
        match family {
            IpFamily::V4 => &self.v4_url,
            IpFamily::V6 => &self.v6_url,
        }
    }

    /// Fetch and validate the address of one family
    async fn fetch(&self, family: IpFamily) -> Result<IpAddr> {
        let url = self.url(family);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ip_source(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::ip_source(format!("Failed to read response from {}: {}", url, e))
        })?;

        let ip = parse_address(&body, family, url.as_str())?;
        debug!("{} address from {}: {}", family, url, ip);
        Ok(ip)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<ObservedAddresses> {
        let v4 = match self.fetch(IpFamily::V4).await? {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(ip) => {
                return Err(Error::ip_source(format!(
                    "expected an IPv4 address, got {}",
                    ip
                )));
            }
        };

        let v6 = match self.fetch(IpFamily::V6).await? {
            IpAddr::V6(ip) => ip,
            IpAddr::V4(ip) => {
                return Err(Error::ip_source(format!(
                    "expected an IPv6 address, got {}",
                    ip
                )));
            }
        };

        Ok(ObservedAddresses::new(v4, v6))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
