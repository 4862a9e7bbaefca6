//! Time source for the scheduling loop

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

/// Monotonic time for pacing plus wall-clock time for observations
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Returns immediately when `deadline` has already passed
    async fn sleep_until(&self, deadline: Instant);

    /// Seconds since the Unix epoch
    fn unix_timestamp(&self) -> f64;
}

/// Tokio timers and the system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
    }

    fn unix_timestamp(&self) -> f64 {
        now_timestamp()
    }
}

/// Current wall-clock time in epoch seconds
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
