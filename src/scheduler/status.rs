//! Live scheduler status

use serde::Serialize;

use crate::alerts::{DispatchResult, HealthVerdict};
use crate::data::Observation;

/// Scheduler state machine; there is no terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Between ticks
    #[default]
    Idle,
    /// Probe pipeline in flight
    Ticking,
}

/// Summary of one completed tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Wall-clock tick start (epoch seconds)
    pub started_at: f64,
    pub observation: Observation,
    pub verdict: HealthVerdict,
    /// Whether this tick's observation reached the store
    pub persisted: bool,
    /// Present when an alert was produced
    pub alert: Option<DispatchResult>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorStatus {
    pub target_url: String,
    pub state: SchedulerState,
    /// Ticks run so far, including ones that faulted
    pub ticks: u64,
    /// Non-healthy verdicts in a row
    pub consecutive_unhealthy: u32,
    pub last_tick: Option<TickReport>,
    /// Observations waiting to be re-sent to the store
    pub backlog: usize,
    /// Last fault that aborted a tick
    pub last_error: Option<String>,
}

impl MonitorStatus {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Default::default()
        }
    }
}
