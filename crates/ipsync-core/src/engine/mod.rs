//! Sync orchestration
//!
//! The SyncEngine is responsible for:
//! - Fetching the observed addresses via IpSource
//! - Attributing each configured domain to its zone
//! - Reconciling the zone's records against the observed addresses
//! - Writing only the changed records via ZoneApi
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   tick ────────▶│  SyncEngine  │──── EngineEvent ────▶ (observers)
//!                 └──────────────┘
//!                         │
//!         ┌───────────────┼───────────────────┐
//!         ▼               ▼                   ▼
//! ┌─────────────┐  ┌──────────────┐   ┌─────────────┐
//! │  IpSource   │  │ RootDomains  │   │   ZoneApi   │
//! │ (observe)   │  │ + reconcile  │   │ (get / put) │
//! └─────────────┘  └──────────────┘   └─────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Fetch observed addresses; on failure the whole cycle is aborted
//! 2. Collect the configured root domains
//! 3. For each configured domain: resolve zone, fetch records, reconcile,
//!    write the changed subset
//! 4. A failure on one domain is recorded and the next domain is processed
//!
//! Nothing is retried within a cycle. The next tick is the retry.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::reconcile::reconcile;
use crate::report::{CycleReport, DomainOutcome, DomainStatus};
use crate::resolver::RootDomains;
use crate::traits::{IpSource, ObservedAddresses, ZoneApi};

/// Capacity of the engine event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started its run loop
    Started {
        domains_count: usize,
        interval: Duration,
    },

    /// Sync cycle started
    CycleStarted { cycle: u64 },

    /// Sync cycle completed (possibly with per-domain failures)
    CycleCompleted { cycle: u64, report: CycleReport },

    /// Sync cycle aborted before any domain was processed
    CycleAborted { cycle: u64, error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Whether a sync cycle is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Syncing,
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Start with [`SyncEngine::run()`] or [`SyncEngine::run_until()`]
/// 3. One cycle runs immediately, then one per interval
/// 4. The loop ends when the shutdown future resolves
///
/// ## Threading
///
/// Exactly one cycle runs at a time. Ticks that fire while a cycle is still
/// running are coalesced, never queued.
pub struct SyncEngine {
    /// Source of the observed addresses
    ip_source: Box<dyn IpSource>,

    /// DNS provider zone access
    zone_api: Box<dyn ZoneApi>,

    /// Configured domains, in processing order
    domains: Vec<String>,

    /// Time between cycle starts
    interval: Duration,

    /// Set while a cycle is running
    syncing: AtomicBool,

    /// Number of cycles started
    cycles: AtomicU64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        zone_api: Box<dyn ZoneApi>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            ip_source,
            zone_api,
            domains: config.domains.clone(),
            interval: config.interval(),
            syncing: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Override the interval from the configuration
    ///
    /// A zero interval is raised to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn state(&self) -> EngineState {
        if self.syncing.load(Ordering::SeqCst) {
            EngineState::Syncing
        } else {
            EngineState::Idle
        }
    }

    /// Run until Ctrl-C is received
    pub async fn run(&self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run one cycle now, then one per interval, until `shutdown` resolves
    ///
    /// A cycle still in flight when `shutdown` resolves is abandoned. Zones
    /// written before that point keep their new records.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.emit_event(EngineEvent::Started {
            domains_count: self.domains.len(),
            interval: self.interval,
        });
        info!(
            "Sync engine started: {} domain(s), interval {:?}",
            self.domains.len(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break "Shutdown signal",
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown during sync cycle, remaining domains not processed");
                    break "Shutdown signal during sync cycle";
                }
                // Failures are logged and reported inside the cycle
                _ = self.run_cycle() => {}
            }
        };

        info!("Shutdown signal received, sync engine stopped");
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });

        Ok(())
    }

    /// Run a single sync cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: Every configured domain was attempted
    /// - `Err(Error)`: The observed addresses could not be fetched; no zone was touched
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let _syncing = SyncingGuard::enter(&self.syncing);
        self.emit_event(EngineEvent::CycleStarted { cycle });

        match self.sync_all().await {
            Ok(report) => {
                info!(
                    "Sync cycle {} done: {} updated, {} unchanged, {} skipped, {} failed",
                    cycle,
                    report.updated(),
                    report.unchanged(),
                    report.skipped(),
                    report.failed()
                );
                self.emit_event(EngineEvent::CycleCompleted {
                    cycle,
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                error!("Sync cycle {} aborted, could not fetch IP addresses: {}", cycle, e);
                self.emit_event(EngineEvent::CycleAborted {
                    cycle,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn sync_all(&self) -> Result<CycleReport> {
        let observed = self.ip_source.current().await?;
        debug!(
            "Observed addresses from {}: IPv4 {}, IPv6 {}",
            self.ip_source.source_name(),
            observed.v4,
            observed.v6
        );

        let roots = RootDomains::from_domains(&self.domains);
        let mut report = CycleReport::new(observed);

        for domain in &self.domains {
            info!("Processing domain: {}", domain);
            let status = self.sync_domain(domain, &roots, &observed).await;
            report.outcomes.push(DomainOutcome::new(domain.as_str(), status));
        }

        Ok(report)
    }

    /// Bring one configured domain in line with the observed addresses
    async fn sync_domain(
        &self,
        domain: &str,
        roots: &RootDomains,
        observed: &ObservedAddresses,
    ) -> DomainStatus {
        let Some(zone) = roots.resolve(domain) else {
            error!("Could not determine root domain for {}, skipping", domain);
            return DomainStatus::Skipped {
                reason: format!("no configured root domain owns {}", domain),
            };
        };

        let records = match self.zone_api.get_records(zone).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch records of zone {} for {}: {}", zone, domain, e);
                return DomainStatus::Failed {
                    zone: zone.to_string(),
                    error: e.to_string(),
                };
            }
        };

        let reconciliation = reconcile(domain, zone, observed, &records);
        if !reconciliation.changed() {
            info!(
                "Records of {} ('{}' in zone {}) are up to date",
                domain, reconciliation.subdomain, zone
            );
            return DomainStatus::Unchanged {
                zone: zone.to_string(),
            };
        }

        for change in &reconciliation.changes {
            warn!(
                "Updating {} record '{}' in zone {} from {} to {}",
                change.entry.record_type,
                change.entry.name,
                zone,
                change.previous_content,
                change.entry.content
            );
        }

        match self
            .zone_api
            .replace_records(zone, &reconciliation.updated_records())
            .await
        {
            Ok(()) => {
                info!(
                    "Updated {} record(s) of {} via {}",
                    reconciliation.changes.len(),
                    domain,
                    self.zone_api.provider_name()
                );
                DomainStatus::Updated {
                    zone: zone.to_string(),
                    changes: reconciliation.changes,
                }
            }
            Err(e) => {
                error!("Failed to update records of {} in zone {}: {}", domain, zone, e);
                DomainStatus::Failed {
                    zone: zone.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Emit an engine event
    ///
    /// A full channel drops the event with a warning. A closed channel means
    /// nobody is listening, which is fine.
    fn emit_event(&self, event: EngineEvent) {
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event");
        }
    }
}

/// Marks the engine as syncing for as long as it lives
///
/// Dropping it also covers cycles abandoned at shutdown.
struct SyncingGuard<'a>(&'a AtomicBool);

impl<'a> SyncingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
