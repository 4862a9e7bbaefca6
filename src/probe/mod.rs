//! Endpoint probing
//!
//! A probe is a single HTTP GET against the monitored target. It never
//! retries and never fails: transport problems are folded into the
//! returned [`RawResult`].

pub mod http;

pub use http::HttpProber;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw outcome of one probe, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// HTTP status code of a completed exchange
    pub status_code: Option<i32>,
    /// Time until the response head arrived
    pub response_time: Option<Duration>,
    /// Set when no HTTP exchange completed
    pub transport_error: Option<TransportErrorKind>,
}

impl RawResult {
    /// A completed HTTP exchange
    pub fn response(status_code: i32, response_time: Duration) -> Self {
        Self {
            status_code: Some(status_code),
            response_time: Some(response_time),
            transport_error: None,
        }
    }

    /// A probe that never got a response
    pub fn failed(kind: TransportErrorKind) -> Self {
        Self {
            status_code: None,
            response_time: None,
            transport_error: Some(kind),
        }
    }
}

/// Why a probe received no response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    ConnectionRefused,
    /// Connect failure other than an explicit refusal
    Connect,
    Timeout,
    Dns,
    Tls,
    /// Anything else that aborted the request (bad URL, protocol error)
    Request,
}

impl TransportErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::Connect => "connection error",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Dns => "DNS resolution failure",
            TransportErrorKind::Tls => "TLS failure",
            TransportErrorKind::Request => "request error",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Something that can probe a target URL
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target_url: &str) -> RawResult;
}
