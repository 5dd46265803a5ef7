//! Update scheduler
//!
//! The UpdateScheduler is responsible for:
//! - Establishing the published address with one mandatory startup cycle
//! - Checking the public address on a short interval
//! - Publishing immediately when the address changes
//! - Refreshing the published address on a long, jittered interval
//!
//! ## Architecture
//!
//! ```text
//!        hourly tick               refresh deadline
//!             │                          │
//!             └──────────┬───────────────┘
//!                        ▼
//!               ┌─────────────────┐
//!               │ UpdateScheduler │── last-known address
//!               └─────────────────┘
//!                   │          │
//!                   ▼          ▼
//!        ┌─────────────────┐ ┌─────────────────┐
//!        │ AddressResolver │ │ UpdatePublisher │
//!        └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## State Machine
//!
//! `Idle → CheckingAddress → (Unchanged | ChangedPendingPublish) → Publishing → Idle`,
//! plus the terminal `Fatal` state reached when the startup cycle fails.
//!
//! ## Serialization
//!
//! Both timers feed a single biased `select!`. Handlers run inline, so only
//! one check or publish is ever in flight. When both timers are ready at
//! the same time the address check is processed first, then the refresh.

mod policy;

pub use policy::SchedulePolicy;

use std::future::Future;
use std::net::Ipv4Addr;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::traits::{AddressResolver, ResolvedAddress, UpdateOutcome, UpdatePublisher};

/// Capacity of the scheduler event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Scheduler lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next timer
    Idle,
    /// Resolving the current address
    CheckingAddress,
    /// Resolved address matches the last-known address
    Unchanged,
    /// Resolved address differs and must be published
    ChangedPendingPublish,
    /// Update request in flight
    Publishing,
    /// Startup failed; the scheduler refuses further work
    Fatal,
}

/// Why a publish was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTrigger {
    /// Mandatory cycle at process start
    Startup,
    /// An address check found a new address
    AddressChanged,
    /// The long refresh interval elapsed
    Refresh,
}

/// Events emitted by the UpdateScheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Startup cycle began
    Started {
        hostname: String,
    },

    /// The resolver returned an address
    AddressResolved {
        address: Ipv4Addr,
        changed: bool,
    },

    /// An update request is about to be sent
    PublishStarted {
        address: Ipv4Addr,
        trigger: PublishTrigger,
    },

    /// The provider confirmed the address
    PublishSucceeded {
        address: Ipv4Addr,
        trigger: PublishTrigger,
        outcome: UpdateOutcome,
    },

    /// The update failed
    PublishFailed {
        address: Ipv4Addr,
        trigger: PublishTrigger,
        error: String,
    },

    /// Daemon loop stopped
    Stopped {
        reason: String,
    },
}

/// Result of a successful address check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckReport {
    /// Address matched the last-known address; nothing was sent
    Unchanged,
    /// Address changed and the provider confirmed the new one
    Published(UpdateOutcome),
}

/// Orchestrates address checks and updates for one hostname
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateScheduler::new()`]
/// 2. Run the mandatory [`UpdateScheduler::startup()`] cycle; any error is fatal
/// 3. Optionally enter daemon mode with [`UpdateScheduler::run_until()`]
///
/// The last-known address lives only in memory and is only ever written by
/// the scheduler itself.
pub struct UpdateScheduler {
    /// Address lookup
    resolver: Box<dyn AddressResolver>,

    /// Provider update client
    publisher: Box<dyn UpdatePublisher>,

    /// Provider credentials, passed by reference to every publish
    credentials: Credentials,

    /// Timer settings
    policy: SchedulePolicy,

    /// Last address the provider confirmed, or refused outright
    last_known: Option<ResolvedAddress>,

    /// Current lifecycle state
    state: SchedulerState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl UpdateScheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields
    /// scheduler events
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        publisher: Box<dyn UpdatePublisher>,
        credentials: Credentials,
        policy: SchedulePolicy,
    ) -> (Self, mpsc::Receiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let scheduler = Self {
            resolver,
            publisher,
            credentials,
            policy,
            last_known: None,
            state: SchedulerState::Idle,
            event_tx: tx,
        };

        (scheduler, rx)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Last address the provider confirmed or refused, if any
    pub fn last_known(&self) -> Option<&ResolvedAddress> {
        self.last_known.as_ref()
    }

    /// Perform the mandatory startup cycle
    ///
    /// Resolves the address and publishes it unconditionally. Any failure
    /// moves the scheduler to [`SchedulerState::Fatal`]: the caller must
    /// not enter daemon mode with unconfirmed DNS state.
    pub async fn startup(&mut self) -> Result<ResolvedAddress> {
        self.ensure_not_fatal()?;
        self.emit_event(SchedulerEvent::Started {
            hostname: self.credentials.hostname.clone(),
        });

        let resolved = match self.resolve().await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.transition(SchedulerState::Fatal);
                return Err(e);
            }
        };

        info!("Seems like current IP address is: {}", resolved);
        info!("Attempting to perform an initial update...");

        match self.publish(&resolved, PublishTrigger::Startup).await {
            Ok(_) => {
                self.last_known = Some(resolved);
                self.transition(SchedulerState::Idle);
                Ok(resolved)
            }
            Err(e) => {
                self.transition(SchedulerState::Fatal);
                Err(e)
            }
        }
    }

    /// Handle an address-check tick
    ///
    /// Publishes only when the resolved address differs from the last-known
    /// one. A confirmed address becomes the last-known one. So does an
    /// address the provider rejects (`abuse`, `badip`, ...): it is not sent
    /// again until the next refresh. Transport, transient and protocol
    /// failures leave the last-known address alone, so the next tick retries.
    pub async fn check_address(&mut self) -> Result<CheckReport> {
        self.ensure_not_fatal()?;
        let last = self.require_last_known()?;

        let resolved = match self.resolve().await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.transition(SchedulerState::Idle);
                return Err(e);
            }
        };

        if resolved.same_address(&last) {
            self.transition(SchedulerState::Unchanged);
            info!("Address is still {}. No need to update.", resolved);
            self.transition(SchedulerState::Idle);
            return Ok(CheckReport::Unchanged);
        }

        self.transition(SchedulerState::ChangedPendingPublish);
        info!(
            "Address has changed since last update ({} -> {}). Updating before the scheduled refresh...",
            last, resolved
        );

        let result = self.publish(&resolved, PublishTrigger::AddressChanged).await;
        self.transition(SchedulerState::Idle);

        match result {
            Ok(outcome) => {
                self.last_known = Some(resolved);
                Ok(CheckReport::Published(outcome))
            }
            Err(e @ Error::Rejected(_)) => {
                warn!("Update of {} was refused, not retrying before the next refresh", resolved);
                self.last_known = Some(resolved);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Handle a refresh tick
    ///
    /// Republishes the last-known address even though it has not changed,
    /// keeping the provider's freshness bookkeeping alive.
    pub async fn refresh(&mut self) -> Result<UpdateOutcome> {
        self.ensure_not_fatal()?;
        let last = self.require_last_known()?;

        info!("Refresh interval has elapsed. Republishing {}...", last);

        let result = self.publish(&last, PublishTrigger::Refresh).await;
        self.transition(SchedulerState::Idle);
        result
    }

    /// Run the daemon loop until `shutdown_rx` fires or its sender is dropped
    pub async fn run_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async move {
            let _ = shutdown_rx.await;
        })
        .await
    }

    /// Run the daemon loop until `shutdown` completes
    ///
    /// Requires a successful [`UpdateScheduler::startup()`] and a policy that
    /// passes [`SchedulePolicy::validate`]. Check and refresh failures are
    /// logged and the loop carries on; the fixed schedule is the retry
    /// mechanism.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.ensure_not_fatal()?;
        self.require_last_known()?;
        self.policy.validate()?;

        let check_interval = self.policy.check_interval;
        let mut check = tokio::time::interval_at(Instant::now() + check_interval, check_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let refresh = tokio::time::sleep(self.next_refresh_delay());
        tokio::pin!(refresh);
        tokio::pin!(shutdown);

        info!("Going to sleep.");

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(SchedulerEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                _ = check.tick() => {
                    match self.check_address().await {
                        Ok(CheckReport::Published(_)) => {
                            // Re-armed before the next poll, so the old deadline can never fire
                            refresh.as_mut().reset(Instant::now() + self.next_refresh_delay());
                        }
                        Ok(CheckReport::Unchanged) => {}
                        Err(e) if e.is_transient() => {
                            warn!("Address check failed, will retry on next tick: {}", e);
                        }
                        Err(e) => error!("Address check failed: {}", e),
                    }
                }

                () = &mut refresh => {
                    match self.refresh().await {
                        Ok(_) => {}
                        Err(e) if e.is_transient() => {
                            warn!("Scheduled refresh failed, will retry at the next refresh: {}", e);
                        }
                        Err(e) => error!("Scheduled refresh failed: {}", e),
                    }
                    refresh.as_mut().reset(Instant::now() + self.next_refresh_delay());
                    info!("Going back to sleep.");
                }
            }
        }

        Ok(())
    }

    /// Resolve the current address and report whether it changed
    async fn resolve(&mut self) -> Result<ResolvedAddress> {
        self.transition(SchedulerState::CheckingAddress);

        let resolved = self.resolver.resolve().await.inspect_err(|e| {
            warn!("Checking IP address failed: {}", e);
        })?;

        let changed = self
            .last_known
            .is_none_or(|last| !last.same_address(&resolved));
        self.emit_event(SchedulerEvent::AddressResolved {
            address: resolved.address(),
            changed,
        });

        Ok(resolved)
    }

    /// Send one update request and classify the outcome
    async fn publish(
        &mut self,
        address: &ResolvedAddress,
        trigger: PublishTrigger,
    ) -> Result<UpdateOutcome> {
        self.transition(SchedulerState::Publishing);
        self.emit_event(SchedulerEvent::PublishStarted {
            address: address.address(),
            trigger,
        });

        debug!(
            "Publishing {} for {} via {} ({:?})",
            address,
            self.credentials.hostname,
            self.publisher.provider_name(),
            trigger
        );

        let result = self
            .publisher
            .publish(&self.credentials, address)
            .await
            .and_then(UpdateOutcome::into_result);

        match &result {
            Ok(outcome) => {
                info!("Update successful ({}): {} -> {}", outcome, self.credentials.hostname, address);
                self.emit_event(SchedulerEvent::PublishSucceeded {
                    address: address.address(),
                    trigger,
                    outcome: outcome.clone(),
                });
            }
            Err(e) => {
                error!("Requesting IP update failed: {}", e);
                self.emit_event(SchedulerEvent::PublishFailed {
                    address: address.address(),
                    trigger,
                    error: e.to_string(),
                });
            }
        }

        result
    }

    fn next_refresh_delay(&self) -> std::time::Duration {
        let delay = self.policy.next_refresh_delay();
        info!("Next scheduled refresh in {} hours", delay.as_secs() / 3600);
        delay
    }

    fn ensure_not_fatal(&self) -> Result<()> {
        if self.state == SchedulerState::Fatal {
            return Err(Error::invalid_state("scheduler is in the fatal state"));
        }
        Ok(())
    }

    fn require_last_known(&self) -> Result<ResolvedAddress> {
        self.last_known
            .ok_or_else(|| Error::invalid_state("no confirmed address yet; run startup first"))
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!("Scheduler state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        if self.event_tx.try_send(event).is_err() {
            // Full or closed: monitoring must never stall the loop
            debug!("Event channel unavailable, dropping scheduler event");
        }
    }
}
