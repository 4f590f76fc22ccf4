// # ipsync-core
//
// Core library for the zone-aware IP syncer.
//
// ## Architecture Overview
//
// This library keeps A/AAAA records of configured domains in line with the
// machine's public addresses:
// - **IpSource**: Trait for discovering the current public IPv4/IPv6 addresses
// - **ZoneApi**: Trait for reading and writing the records of a DNS zone
// - **TokenCache**: Trait for sharing provider authentication tokens
// - **RootDomains**: Attributes a configured domain to the zone that owns it
// - **reconcile**: Computes the minimal set of record changes for one domain
// - **SyncEngine**: Runs one sync cycle now and then on a fixed interval
//
// ## Design Principles
//
// 1. **Pure core**: Zone resolution and reconciliation are plain functions over in-memory data
// 2. **Explicit dependencies**: Providers own their token cache; nothing is process-global
// 3. **Failure isolation**: One domain's failure never blocks the others in a cycle
// 4. **Stateless cycles**: Every tick re-reads live provider state; nothing is persisted

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use cache::MemoryTokenCache;
pub use config::{AccountConfig, SyncConfig};
pub use engine::{EngineEvent, EngineState, SyncEngine};
pub use error::{Error, Result};
pub use reconcile::{Reconciliation, RecordChange, reconcile};
pub use report::{CycleReport, DomainOutcome, DomainStatus};
pub use resolver::RootDomains;
pub use traits::{AuthToken, DnsEntry, IpFamily, IpSource, ObservedAddresses, TokenCache, ZoneApi};
