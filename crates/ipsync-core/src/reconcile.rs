//! Record reconciliation
//!
//! Computes the minimal set of record changes that brings one configured
//! domain in line with the observed addresses.
//!
//! ## Rules
//!
//! - Only entries whose `name` equals the domain's label inside the zone are
//!   considered (`"@"` for the apex).
//! - `A` entries are compared with the observed IPv4 address, `AAAA` entries
//!   with the observed IPv6 address. Other types are never touched.
//! - Only differing entries are returned, with their new content. Records are
//!   never created or deleted: a missing `A`/`AAAA` entry stays missing.

use serde::Serialize;

use crate::traits::{APEX_NAME, DnsEntry, IpFamily, ObservedAddresses};

/// One staged record change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordChange {
    /// The entry with its new content
    pub entry: DnsEntry,

    /// The content the entry had before
    pub previous_content: String,
}

/// The outcome of reconciling one domain against its zone
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// The domain's record name inside the zone
    pub subdomain: String,

    /// Staged changes, in zone record order
    pub changes: Vec<RecordChange>,
}

impl Reconciliation {
    /// Whether any record needs to be written
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// The changed entries with their new content
    pub fn updated_records(&self) -> Vec<DnsEntry> {
        self.changes.iter().map(|c| c.entry.clone()).collect()
    }
}

/// The record name of `domain` inside the zone `root_domain`
///
/// Returns `"@"` for the apex and the label prefix otherwise
/// (`www.example.com` in `example.com` → `www`). Returns `None` when `domain`
/// is not inside the zone.
pub fn subdomain_label<'a>(domain: &'a str, root_domain: &str) -> Option<&'a str> {
    if domain == root_domain {
        return Some(APEX_NAME);
    }

    domain
        .strip_suffix(root_domain)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .filter(|label| !label.is_empty())
}

/// Reconcile the records of one domain
///
/// Pure function over its inputs. A domain outside `root_domain` yields an
/// empty reconciliation.
pub fn reconcile(
    domain: &str,
    root_domain: &str,
    observed: &ObservedAddresses,
    zone_records: &[DnsEntry],
) -> Reconciliation {
    let Some(subdomain) = subdomain_label(domain, root_domain) else {
        return Reconciliation::default();
    };

    let changes = zone_records
        .iter()
        .filter(|entry| entry.name == subdomain)
        .filter_map(|entry| {
            let family = IpFamily::from_record_type(&entry.record_type)?;
            if observed.matches(family, &entry.content) {
                return None;
            }

            let mut updated = entry.clone();
            updated.content = observed.for_family(family).to_string();
            Some(RecordChange {
                entry: updated,
                previous_content: entry.content.clone(),
            })
        })
        .collect();

    Reconciliation {
        subdomain: subdomain.to_string(),
        changes,
    }
}
