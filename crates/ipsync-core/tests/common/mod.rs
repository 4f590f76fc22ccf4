//! Test doubles and common utilities for sync contract tests
//!
//! These doubles replace the network-facing collaborators (IP source, zone
//! API) with in-memory versions that record every call.

#![allow(dead_code)]

use ipsync_core::error::{Error, Result};
use ipsync_core::traits::{DnsEntry, IpSource, ObservedAddresses, ZoneApi};
use ipsync_core::SyncConfig;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Build observed addresses from string literals
pub fn observed(v4: &str, v6: &str) -> ObservedAddresses {
    ObservedAddresses::new(v4.parse().unwrap(), v6.parse().unwrap())
}

/// An IP source that returns fixed addresses and counts calls
#[derive(Clone)]
pub struct StaticIpSource {
    addresses: Arc<Mutex<ObservedAddresses>>,
    call_count: Arc<AtomicUsize>,
}

impl StaticIpSource {
    pub fn new(addresses: ObservedAddresses) -> Self {
        Self {
            addresses: Arc::new(Mutex::new(addresses)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Change the addresses returned from now on
    pub fn set(&self, addresses: ObservedAddresses) {
        *self.addresses.lock().unwrap() = addresses;
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<ObservedAddresses> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(*self.addresses.lock().unwrap())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// An IP source that always fails, like an IPv6 request answered with IPv4
pub struct FailingIpSource {
    message: String,
}

impl FailingIpSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for FailingIpSource {
    async fn current(&self) -> Result<ObservedAddresses> {
        Err(Error::ip_source(self.message.clone()))
    }

    fn source_name(&self) -> &'static str {
        "failing"
    }
}

/// A recorded replace_records() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceCall {
    pub zone: String,
    pub entries: Vec<DnsEntry>,
}

/// An in-memory zone API that applies writes and records every call
///
/// Clones share zones, counters and failure switches, so a test can keep a
/// handle while the engine owns a boxed clone.
#[derive(Clone, Default)]
pub struct MockZoneApi {
    zones: Arc<Mutex<HashMap<String, Vec<DnsEntry>>>>,
    replace_calls: Arc<Mutex<Vec<ReplaceCall>>>,
    get_calls: Arc<Mutex<Vec<String>>>,
    failing_gets: Arc<Mutex<HashSet<String>>>,
    failing_replaces: Arc<Mutex<HashSet<String>>>,
    held_gets: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl MockZoneApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone with the given records
    pub fn with_zone(self, zone: &str, records: Vec<DnsEntry>) -> Self {
        self.zones.lock().unwrap().insert(zone.to_string(), records);
        self
    }

    /// Make get_records() fail for `zone`
    pub fn fail_get(&self, zone: &str) {
        self.failing_gets.lock().unwrap().insert(zone.to_string());
    }

    /// Make replace_records() fail for `zone`
    pub fn fail_replace(&self, zone: &str) {
        self.failing_replaces.lock().unwrap().insert(zone.to_string());
    }

    /// Make get_records() for `zone` wait until the returned gate is notified
    pub fn hold_get(&self, zone: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held_gets
            .lock()
            .unwrap()
            .insert(zone.to_string(), gate.clone());
        gate
    }

    /// Current records of `zone`
    pub fn records(&self, zone: &str) -> Vec<DnsEntry> {
        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    pub fn replace_calls(&self) -> Vec<ReplaceCall> {
        self.replace_calls.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.get_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ZoneApi for MockZoneApi {
    async fn get_records(&self, zone: &str) -> Result<Vec<DnsEntry>> {
        self.get_calls.lock().unwrap().push(zone.to_string());

        let gate = self.held_gets.lock().unwrap().get(zone).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing_gets.lock().unwrap().contains(zone) {
            return Err(Error::provider("mock", format!("zone {} unavailable", zone)));
        }

        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone)))
    }

    async fn replace_records(&self, zone: &str, entries: &[DnsEntry]) -> Result<()> {
        self.replace_calls.lock().unwrap().push(ReplaceCall {
            zone: zone.to_string(),
            entries: entries.to_vec(),
        });

        if self.failing_replaces.lock().unwrap().contains(zone) {
            return Err(Error::provider("mock", format!("write to {} rejected", zone)));
        }

        // Apply like a single-entry update: match on name + type + ttl
        let mut zones = self.zones.lock().unwrap();
        let records = zones.entry(zone.to_string()).or_default();
        for entry in entries {
            if let Some(existing) = records.iter_mut().find(|r| {
                r.name == entry.name && r.record_type == entry.record_type && r.expire == entry.expire
            }) {
                existing.content = entry.content.clone();
            }
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config(domains: &[&str]) -> SyncConfig {
    let mut config = SyncConfig::new(
        "test-account",
        domains.iter().map(|d| d.to_string()).collect(),
    );
    config.sync_interval = 1;
    config
}
