//! Fixed-rate probe scheduler

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::clock::{Clock, SystemClock};
use super::status::{MonitorStatus, SchedulerState, TickReport};
use crate::alerts::{evaluate, AlertDispatcher, Thresholds};
use crate::data::Observation;
use crate::probe::{Prober, RawResult, TransportErrorKind};
use crate::storage::{ObservationStore, StoreError, DEFAULT_STORE_TIMEOUT};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
/// Longest accepted interval (one year)
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
pub const DEFAULT_BACKLOG_CAPACITY: usize = 32;

/// Slack on top of the prober's own request timeout before a probe is
/// abandoned by the scheduler
const PROBE_GRACE: Duration = Duration::from_secs(1);

/// Drives probe, evaluate, persist and alert on a fixed interval.
///
/// Each tick starts `interval` after the previous one started. Ticks never
/// overlap: a tick that overruns makes the next one start as soon as it
/// finishes. Late wake-ups are not compensated.
pub struct Scheduler {
    target_url: String,
    interval: Duration,
    thresholds: Thresholds,
    prober: Arc<dyn Prober>,
    store: Arc<dyn ObservationStore>,
    dispatcher: AlertDispatcher,
    clock: Arc<dyn Clock>,
    probe_budget: Duration,
    store_timeout: Duration,
    backlog_capacity: usize,
    /// Observations whose append failed, oldest first
    backlog: Mutex<VecDeque<Observation>>,
    status: Arc<RwLock<MonitorStatus>>,
}

impl Scheduler {
    pub fn new(
        target_url: impl Into<String>,
        prober: Arc<dyn Prober>,
        store: Arc<dyn ObservationStore>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        let target_url = target_url.into();
        Self {
            status: Arc::new(RwLock::new(MonitorStatus::new(target_url.clone()))),
            target_url,
            interval: DEFAULT_INTERVAL,
            thresholds: Thresholds::default(),
            prober,
            store,
            dispatcher,
            clock: Arc::new(SystemClock),
            probe_budget: crate::probe::http::DEFAULT_PROBE_TIMEOUT + PROBE_GRACE,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            backlog_capacity: DEFAULT_BACKLOG_CAPACITY,
            backlog: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound on one probe, normally the prober's request timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_budget = timeout.saturating_add(PROBE_GRACE);
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Zero drops failed writes instead of retrying them
    pub fn with_backlog_capacity(mut self, capacity: usize) -> Self {
        self.backlog_capacity = capacity;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Snapshot of the live status
    pub fn status(&self) -> MonitorStatus {
        self.status.read().clone()
    }

    /// Shared status, for readers outside the loop
    pub fn status_handle(&self) -> Arc<RwLock<MonitorStatus>> {
        Arc::clone(&self.status)
    }

    /// Spawn the loop; stop it through the returned handle
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let join = tokio::spawn(async move {
            tracing::info!(
                target_url = %self.target_url,
                interval = ?self.interval,
                store = self.store.name(),
                notifier = self.dispatcher.notifier_name(),
                "Scheduler started"
            );
            self.run(&mut shutdown_rx).await;
            tracing::info!("Scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, join }
    }

    /// Loop until `shutdown` fires or its sender is dropped
    pub async fn run(&self, shutdown: &mut mpsc::Receiver<()>) {
        self.run_loop(None, Some(shutdown)).await;
    }

    /// Run exactly `ticks` fixed-rate ticks, the first one immediately
    pub async fn run_ticks(&self, ticks: u64) {
        self.run_loop(Some(ticks), None).await;
    }

    async fn run_loop(&self, max_ticks: Option<u64>, mut shutdown: Option<&mut mpsc::Receiver<()>>) {
        let mut next_start = self.clock.now();
        let mut completed = 0u64;

        loop {
            if max_ticks.is_some_and(|max| completed >= max) {
                break;
            }

            match shutdown.as_deref_mut() {
                Some(rx) => {
                    tokio::select! {
                        biased;
                        _ = rx.recv() => {
                            tracing::info!("Scheduler shutting down");
                            break;
                        }
                        _ = self.clock.sleep_until(next_start) => {}
                    }
                }
                None => self.clock.sleep_until(next_start).await,
            }

            let now = self.clock.now();
            next_start = now
                .checked_add(self.interval)
                .or_else(|| now.checked_add(MAX_INTERVAL))
                .unwrap_or(now);
            self.guarded_tick().await;
            completed += 1;
        }
    }

    /// Run one tick, containing any panic outside the probe
    async fn guarded_tick(&self) {
        if let Err(panic) = AssertUnwindSafe(self.tick()).catch_unwind().await {
            let message = panic_message(panic.as_ref());

            tracing::error!(error = %message, "Tick aborted");

            let mut status = self.status.write();
            status.state = SchedulerState::Idle;
            status.ticks += 1;
            status.last_error = Some(message);
        }
    }

    /// One probe, evaluate, persist and maybe-alert pipeline
    pub async fn tick(&self) -> TickReport {
        self.status.write().state = SchedulerState::Ticking;
        let started_at = self.clock.unix_timestamp();

        let probe = AssertUnwindSafe(self.prober.probe(&self.target_url)).catch_unwind();
        let raw = match tokio::time::timeout(self.probe_budget, probe).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(panic)) => {
                tracing::error!(
                    target_url = %self.target_url,
                    error = %panic_message(panic.as_ref()),
                    "Probe panicked"
                );
                RawResult::failed(TransportErrorKind::Request)
            }
            Err(_) => {
                tracing::warn!(target_url = %self.target_url, "Probe exceeded its time budget");
                RawResult::failed(TransportErrorKind::Timeout)
            }
        };

        let evaluation = evaluate(&raw, self.clock.unix_timestamp(), &self.thresholds);

        tracing::info!(
            status_code = ?evaluation.observation.status_code,
            response_time = ?evaluation.observation.response_time,
            verdict = %evaluation.verdict,
            "Health check"
        );

        // Persisting and alerting are independent; neither waits on the
        // other's outcome.
        let ((persisted, backlog), alert) = tokio::join!(
            self.persist(&evaluation.observation),
            async {
                match &evaluation.alert {
                    Some(message) => Some(self.dispatcher.dispatch(message).await),
                    None => None,
                }
            }
        );

        let report = TickReport {
            started_at,
            observation: evaluation.observation,
            verdict: evaluation.verdict,
            persisted,
            alert,
        };

        {
            let mut status = self.status.write();
            status.state = SchedulerState::Idle;
            status.ticks += 1;
            status.backlog = backlog;
            status.last_error = None;
            if report.verdict.is_healthy() {
                status.consecutive_unhealthy = 0;
            } else {
                status.consecutive_unhealthy += 1;
            }
            status.last_tick = Some(report.clone());
        }

        report
    }

    /// Write the backlog then `observation`, in order. Returns whether
    /// `observation` itself was stored, and the backlog length afterwards.
    async fn persist(&self, observation: &Observation) -> (bool, usize) {
        let mut backlog = self.backlog.lock().await;

        while let Some(pending) = backlog.front() {
            match self.append(pending).await {
                Ok(()) => {
                    backlog.pop_front();
                }
                Err(e) => {
                    tracing::warn!(
                        store = self.store.name(),
                        error = %e,
                        pending = backlog.len(),
                        "Store still failing, keeping backlog"
                    );
                    self.enqueue(&mut backlog, observation.clone());
                    return (false, backlog.len());
                }
            }
        }

        match self.append(observation).await {
            Ok(()) => (true, 0),
            Err(e) => {
                tracing::error!(
                    store = self.store.name(),
                    error = %e,
                    timestamp = observation.timestamp,
                    "Failed to persist observation"
                );
                self.enqueue(&mut backlog, observation.clone());
                (false, backlog.len())
            }
        }
    }

    async fn append(&self, observation: &Observation) -> Result<(), StoreError> {
        match tokio::time::timeout(self.store_timeout, self.store.append(observation)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }

    fn enqueue(&self, backlog: &mut VecDeque<Observation>, observation: Observation) {
        if self.backlog_capacity == 0 {
            tracing::warn!(timestamp = observation.timestamp, "Observation dropped");
            return;
        }
        if backlog.len() >= self.backlog_capacity {
            if let Some(dropped) = backlog.pop_front() {
                tracing::warn!(
                    timestamp = dropped.timestamp,
                    capacity = self.backlog_capacity,
                    "Backlog full, dropping oldest observation"
                );
            }
        }
        backlog.push_back(observation);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Handle to a spawned scheduler
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the in-flight tick to finish
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
