//! Observation record written once per probe tick

use serde::{Deserialize, Serialize};

/// Outcome of a single probe, as persisted to the observation store.
///
/// `status_code` and `response_time` are both `None` when the probe never
/// received a response; that is still a recorded outcome, not an omission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Probe completion time (seconds since the Unix epoch)
    pub timestamp: f64,
    /// HTTP status code, `null` on transport failure
    pub status_code: Option<i32>,
    /// Elapsed request time in seconds, `null` on transport failure
    pub response_time: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: f64, status_code: Option<i32>, response_time: Option<f64>) -> Self {
        Self {
            timestamp,
            status_code,
            response_time,
        }
    }

    /// Observation for a probe that got no response
    pub fn unreachable(timestamp: f64) -> Self {
        Self::new(timestamp, None, None)
    }

    /// Whether any HTTP response was received
    pub fn has_response(&self) -> bool {
        self.status_code.is_some()
    }

    /// Timestamp as a UTC datetime, if representable
    pub fn datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9) as u32;
        chrono::DateTime::from_timestamp(secs as i64, nanos)
    }
}
