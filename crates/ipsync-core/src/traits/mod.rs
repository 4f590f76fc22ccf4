//! Core traits for the IP syncer
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the current public addresses
//! - [`ZoneApi`]: Read and write the records of a DNS zone
//! - [`TokenCache`]: Share provider authentication tokens between calls

pub mod ip_source;
pub mod token_cache;
pub mod zone_api;

pub use ip_source::{IpFamily, IpSource, ObservedAddresses, parse_address};
pub use token_cache::{AuthToken, TokenCache};
pub use zone_api::{APEX_NAME, DnsEntry, ZoneApi};
