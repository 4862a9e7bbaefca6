//! Health thresholds and alert message types

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::Observation;

/// Classification thresholds for probe results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Codes for the primary "is it up" judgment
    pub healthy_codes: BTreeSet<i32>,
    /// Codes that are at least acceptable; anything else is unreachable
    pub acceptable_codes: BTreeSet<i32>,
    /// Latency at or above which an acceptable response is degraded
    #[serde(with = "duration_secs")]
    pub degraded_latency: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            healthy_codes: BTreeSet::from([200]),
            acceptable_codes: BTreeSet::from([200, 204]),
            degraded_latency: Duration::from_secs(3),
        }
    }
}

impl Thresholds {
    /// Set the acceptable status codes
    pub fn with_acceptable_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.acceptable_codes = codes.into_iter().collect();
        self
    }

    /// Set the primary healthy status codes
    pub fn with_healthy_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.healthy_codes = codes.into_iter().collect();
        self
    }

    /// Set the degraded latency threshold
    pub fn with_degraded_latency(mut self, latency: Duration) -> Self {
        self.degraded_latency = latency;
        self
    }

    /// Whether `status_code` counts as a successful answer
    pub fn is_acceptable(&self, status_code: i32) -> bool {
        self.acceptable_codes.contains(&status_code)
    }

    /// Whether a response at `response_time` is degraded; the threshold
    /// itself counts as slow
    pub fn is_slow(&self, response_time: Duration) -> bool {
        response_time >= self.degraded_latency
    }

    /// Primary "is it up" judgment over a stored observation: a healthy
    /// status code answered faster than the latency threshold.
    pub fn is_up(&self, observation: &Observation) -> bool {
        match (observation.status_code, observation.response_time) {
            (Some(code), Some(secs)) => {
                self.healthy_codes.contains(&code)
                    && secs < self.degraded_latency.as_secs_f64()
            }
            _ => false,
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("WARNING"),
            Severity::Critical => f.write_str("CRITICAL"),
        }
    }
}

/// Alert produced for a non-healthy verdict; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub severity: Severity,
    pub text: String,
}

impl AlertMessage {
    /// Create a warning for a slow but answering endpoint
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    /// Create a critical alert for an unreachable or failing endpoint
    pub fn critical(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            text: text.into(),
        }
    }

    /// Text delivered to the notification channel
    pub fn content(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)
    }
}

/// Duration as fractional seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
