//! Per-cycle sync report
//!
//! Every configured domain gets exactly one outcome per cycle, so a failure on
//! one domain is visible next to the domains that were still processed.

use crate::reconcile::RecordChange;
use crate::traits::ObservedAddresses;

/// What happened to one configured domain during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainStatus {
    /// Records were written
    Updated {
        zone: String,
        changes: Vec<RecordChange>,
    },

    /// All matching records already held the observed addresses
    Unchanged { zone: String },

    /// The domain could not be attributed to a configured zone
    Skipped { reason: String },

    /// Fetching or writing the zone failed
    Failed { zone: String, error: String },
}

/// Outcome for one configured domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainOutcome {
    pub domain: String,
    pub status: DomainStatus,
}

impl DomainOutcome {
    pub fn new(domain: impl Into<String>, status: DomainStatus) -> Self {
        Self {
            domain: domain.into(),
            status,
        }
    }
}

/// Result of one completed sync cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Addresses the cycle reconciled against
    pub observed: ObservedAddresses,

    /// One outcome per configured domain, in configuration order
    pub outcomes: Vec<DomainOutcome>,
}

impl CycleReport {
    pub fn new(observed: ObservedAddresses) -> Self {
        Self {
            observed,
            outcomes: Vec::new(),
        }
    }

    /// Outcome for `domain`, if it was configured
    pub fn outcome(&self, domain: &str) -> Option<&DomainStatus> {
        self.outcomes
            .iter()
            .find(|o| o.domain == domain)
            .map(|o| &o.status)
    }

    pub fn updated(&self) -> usize {
        self.count(|s| matches!(s, DomainStatus::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|s| matches!(s, DomainStatus::Unchanged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DomainStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DomainStatus::Failed { .. }))
    }

    /// Whether no domain was skipped or failed
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0 && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&DomainStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
