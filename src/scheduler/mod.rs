//! Monitoring loop
//!
//! Runs the probe pipeline at a fixed rate, forever, containing every
//! per-tick failure.

pub mod clock;
pub mod monitor;
pub mod status;

pub use clock::{now_timestamp, Clock, SystemClock};
pub use monitor::{Scheduler, SchedulerHandle, DEFAULT_INTERVAL, MAX_INTERVAL};
pub use status::{MonitorStatus, SchedulerState, TickReport};
