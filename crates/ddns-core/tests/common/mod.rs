//! Test doubles and common utilities for scheduler contract tests
//!
//! The doubles never touch the network. Each one is cheaply cloneable and
//! shares its counters between clones, so a test can keep a handle after
//! boxing a clone into the scheduler.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{AddressResolver, ResolvedAddress, UpdateOutcome, UpdatePublisher};
use ddns_core::{Credentials, PublishTrigger, SchedulePolicy, SchedulerEvent, UpdateScheduler};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const FIRST_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);
pub const SECOND_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 9);

pub const HOUR: Duration = Duration::from_secs(3600);

/// One scripted resolver answer
#[derive(Debug, Clone, Copy)]
pub enum ResolveStep {
    Address(Ipv4Addr),
    NetworkError,
    ParseError,
}

struct ResolverInner {
    current: Mutex<Ipv4Addr>,
    script: Mutex<VecDeque<ResolveStep>>,
    calls: AtomicUsize,
}

/// Resolver that replays scripted steps, then keeps returning `current`
#[derive(Clone)]
pub struct ScriptedResolver {
    inner: Arc<ResolverInner>,
}

impl ScriptedResolver {
    pub fn new(current: Ipv4Addr) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                current: Mutex::new(current),
                script: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Change the address returned once the script is exhausted
    pub fn set_address(&self, address: Ipv4Addr) {
        *self.inner.current.lock().unwrap() = address;
    }

    /// Queue a one-off answer
    pub fn push(&self, step: ResolveStep) {
        self.inner.script.lock().unwrap().push_back(step);
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<ResolvedAddress> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);

        let step = self
            .inner
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ResolveStep::Address(*self.inner.current.lock().unwrap()));

        match step {
            ResolveStep::Address(address) => Ok(ResolvedAddress::new(address)),
            ResolveStep::NetworkError => Err(Error::network("connection refused")),
            ResolveStep::ParseError => Err(Error::parse("no IPv4 address found", "<html></html>")),
        }
    }
}

/// One scripted publisher answer
#[derive(Debug, Clone)]
pub enum PublishStep {
    Outcome(UpdateOutcome),
    NetworkError,
}

struct PublisherInner {
    script: Mutex<VecDeque<PublishStep>>,
    provider_record: Mutex<Option<Ipv4Addr>>,
    published: Mutex<Vec<Ipv4Addr>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

/// Publisher that replays scripted answers, then behaves like dy.fi:
/// `good` for a new address, `nochg` for the address it already has
#[derive(Clone)]
pub struct RecordingPublisher {
    inner: Arc<PublisherInner>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Each publish takes `latency` of (virtual) time
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                script: Mutex::new(VecDeque::new()),
                provider_record: Mutex::new(None),
                published: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                latency,
            }),
        }
    }

    /// Queue a one-off answer
    pub fn push(&self, step: PublishStep) {
        self.inner.script.lock().unwrap().push_back(step);
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Addresses passed to every publish call, in order
    pub fn published(&self) -> Vec<Ipv4Addr> {
        self.inner.published.lock().unwrap().clone()
    }

    /// Highest number of publishes ever running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UpdatePublisher for RecordingPublisher {
    async fn publish(
        &self,
        credentials: &Credentials,
        address: &ResolvedAddress,
    ) -> Result<UpdateOutcome> {
        assert_eq!(credentials.hostname, "home.dy.fi");

        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.published.lock().unwrap().push(address.address());

        let running = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.inner.script.lock().unwrap().pop_front();
        match scripted {
            Some(PublishStep::Outcome(outcome)) => Ok(outcome),
            Some(PublishStep::NetworkError) => Err(Error::network("connection reset")),
            None => {
                let mut record = self.inner.provider_record.lock().unwrap();
                if *record == Some(address.address()) {
                    Ok(UpdateOutcome::Unchanged)
                } else {
                    *record = Some(address.address());
                    Ok(UpdateOutcome::Accepted)
                }
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new("user", "secret", "home.dy.fi", "admin@example.com")
}

/// Hourly checks, fixed refresh interval, no jitter
pub fn fixed_policy(refresh_hours: u64) -> SchedulePolicy {
    SchedulePolicy::new(HOUR, HOUR * refresh_hours as u32, Duration::ZERO)
}

pub fn build_scheduler(
    resolver: &ScriptedResolver,
    publisher: &RecordingPublisher,
    policy: SchedulePolicy,
) -> (UpdateScheduler, mpsc::Receiver<SchedulerEvent>) {
    UpdateScheduler::new(
        Box::new(resolver.clone()),
        Box::new(publisher.clone()),
        test_credentials(),
        policy,
    )
}

/// Run the daemon loop on its own task; the handle hands the scheduler back
pub fn spawn_daemon(
    mut scheduler: UpdateScheduler,
) -> (oneshot::Sender<()>, JoinHandle<(UpdateScheduler, Result<()>)>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let result = scheduler.run_with_shutdown(shutdown_rx).await;
        (scheduler, result)
    });
    (shutdown_tx, handle)
}

pub fn drain_events(rx: &mut mpsc::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Triggers of every publish the scheduler started, in order
pub fn publish_triggers(events: &[SchedulerEvent]) -> Vec<PublishTrigger> {
    events
        .iter()
        .filter_map(|event| match event {
            SchedulerEvent::PublishStarted { trigger, .. } => Some(*trigger),
            _ => None,
        })
        .collect()
}
