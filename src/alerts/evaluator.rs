//! Probe result classification

use serde::{Deserialize, Serialize};

use super::config::{AlertMessage, Thresholds};
use crate::data::Observation;
use crate::probe::RawResult;

/// Health classification of a single observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthVerdict {
    Healthy,
    Degraded,
    Unreachable,
}

impl HealthVerdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthVerdict::Healthy)
    }
}

impl std::fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthVerdict::Healthy => f.write_str("healthy"),
            HealthVerdict::Degraded => f.write_str("degraded"),
            HealthVerdict::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// Everything derived from one raw probe result
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub observation: Observation,
    pub verdict: HealthVerdict,
    /// Present for every non-healthy verdict
    pub alert: Option<AlertMessage>,
}

/// Classify a raw probe result.
///
/// Rules apply in order, first match wins:
/// 1. transport error: unreachable
/// 2. missing or unacceptable status: unreachable
/// 3. acceptable status, latency at or above threshold: degraded
/// 4. acceptable status, latency below threshold: healthy
pub fn evaluate(raw: &RawResult, now: f64, thresholds: &Thresholds) -> Evaluation {
    let observation = Observation::new(
        now,
        raw.status_code,
        raw.response_time.map(|d| d.as_secs_f64()),
    );

    let (verdict, alert) = classify(raw, thresholds);

    Evaluation {
        observation,
        verdict,
        alert,
    }
}

fn classify(raw: &RawResult, thresholds: &Thresholds) -> (HealthVerdict, Option<AlertMessage>) {
    if let Some(kind) = raw.transport_error {
        return (
            HealthVerdict::Unreachable,
            Some(AlertMessage::critical(format!(
                "Problem detected! Endpoint unreachable: {}",
                kind
            ))),
        );
    }

    let code = match raw.status_code {
        Some(code) if thresholds.is_acceptable(code) => code,
        Some(code) => {
            let text = match raw.response_time {
                Some(elapsed) => format!(
                    "Problem detected! Status code: {}, Response time: {:.2}s",
                    code,
                    elapsed.as_secs_f64()
                ),
                None => format!("Problem detected! Status code: {}", code),
            };
            return (HealthVerdict::Unreachable, Some(AlertMessage::critical(text)));
        }
        None => {
            return (
                HealthVerdict::Unreachable,
                Some(AlertMessage::critical(
                    "Problem detected! No status code received",
                )),
            );
        }
    };

    match raw.response_time {
        Some(elapsed) if thresholds.is_slow(elapsed) => (
            HealthVerdict::Degraded,
            Some(AlertMessage::warning(format!(
                "Slow response! Status code: {}, Response time: {:.2}s (threshold {:.2}s)",
                code,
                elapsed.as_secs_f64(),
                thresholds.degraded_latency.as_secs_f64()
            ))),
        ),
        Some(_) => (HealthVerdict::Healthy, None),
        // A completed exchange without a timing cannot be judged fast
        None => (
            HealthVerdict::Degraded,
            Some(AlertMessage::warning(format!(
                "Slow response! Status code: {}, Response time: unknown",
                code
            ))),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::config::Severity;
    use crate::probe::TransportErrorKind;
    use std::time::Duration;

    const NOW: f64 = 1_700_000_000.0;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_healthy_below_threshold() {
        let thresholds = Thresholds::default();

        for latency in [0.0, 0.1, 0.8, 2.5, 2.999] {
            let eval = evaluate(&RawResult::response(200, secs(latency)), NOW, &thresholds);
            assert_eq!(eval.verdict, HealthVerdict::Healthy, "latency {}", latency);
            assert!(eval.alert.is_none());
        }
    }

    #[test]
    fn test_degraded_at_or_above_threshold() {
        let thresholds = Thresholds::default();

        for code in [200, 204] {
            for latency in [3.0, 3.5, 10.0] {
                let eval = evaluate(&RawResult::response(code, secs(latency)), NOW, &thresholds);
                assert_eq!(eval.verdict, HealthVerdict::Degraded);
                let alert = eval.alert.unwrap();
                assert_eq!(alert.severity, Severity::Warning);
                assert!(alert.text.contains(&code.to_string()));
            }
        }
    }

    #[test]
    fn test_unacceptable_status_is_unreachable() {
        let thresholds = Thresholds::default();

        for code in [500, 503, 404, 301, 201] {
            for latency in [0.1, 5.0] {
                let eval = evaluate(&RawResult::response(code, secs(latency)), NOW, &thresholds);
                assert_eq!(eval.verdict, HealthVerdict::Unreachable);
                let alert = eval.alert.unwrap();
                assert_eq!(alert.severity, Severity::Critical);
                assert!(alert.text.contains(&code.to_string()));
            }
        }
    }

    #[test]
    fn test_transport_error_is_unreachable() {
        let thresholds = Thresholds::default();
        let raw = RawResult::failed(TransportErrorKind::Timeout);

        let eval = evaluate(&raw, NOW, &thresholds);

        assert_eq!(eval.verdict, HealthVerdict::Unreachable);
        assert_eq!(eval.observation.status_code, None);
        assert_eq!(eval.observation.response_time, None);
        let alert = eval.alert.unwrap();
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.text.contains("timeout"));
    }

    #[test]
    fn test_transport_error_wins_over_status() {
        let raw = RawResult {
            status_code: Some(200),
            response_time: Some(secs(0.1)),
            transport_error: Some(TransportErrorKind::Tls),
        };

        let eval = evaluate(&raw, NOW, &Thresholds::default());
        assert_eq!(eval.verdict, HealthVerdict::Unreachable);
        assert!(eval.alert.unwrap().text.contains("TLS"));
    }

    #[test]
    fn test_missing_status_without_error_is_unreachable() {
        let raw = RawResult {
            status_code: None,
            response_time: None,
            transport_error: None,
        };

        let eval = evaluate(&raw, NOW, &Thresholds::default());
        assert_eq!(eval.verdict, HealthVerdict::Unreachable);
        assert!(eval.alert.is_some());
    }

    #[test]
    fn test_evaluate_is_pure() {
        let thresholds = Thresholds::default();
        let raw = RawResult::response(200, secs(4.2));

        let first = evaluate(&raw, NOW, &thresholds);
        let second = evaluate(&raw, NOW, &thresholds);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scenario_healthy() {
        let eval = evaluate(&RawResult::response(200, secs(0.8)), NOW, &Thresholds::default());

        assert_eq!(eval.observation.timestamp, NOW);
        assert_eq!(eval.observation.status_code, Some(200));
        assert!((eval.observation.response_time.unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(eval.verdict, HealthVerdict::Healthy);
        assert!(eval.alert.is_none());
    }

    #[test]
    fn test_scenario_degraded() {
        let eval = evaluate(&RawResult::response(200, secs(4.2)), NOW, &Thresholds::default());

        assert_eq!(eval.verdict, HealthVerdict::Degraded);
        let text = eval.alert.unwrap().text;
        assert!(text.contains("200"));
        assert!(text.contains("4.2"));
    }

    #[test]
    fn test_scenario_service_unavailable() {
        let eval = evaluate(&RawResult::response(503, secs(0.3)), NOW, &Thresholds::default());

        assert_eq!(eval.verdict, HealthVerdict::Unreachable);
        assert!(eval.alert.unwrap().text.contains("503"));
    }

    #[test]
    fn test_scenario_connection_refused() {
        let raw = RawResult::failed(TransportErrorKind::ConnectionRefused);
        let eval = evaluate(&raw, NOW, &Thresholds::default());

        assert_eq!(eval.verdict, HealthVerdict::Unreachable);
        assert_eq!(eval.observation.status_code, None);
        assert!(eval.alert.unwrap().text.contains("connection refused"));
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds::default()
            .with_acceptable_codes([200])
            .with_degraded_latency(secs(1.0));

        let eval = evaluate(&RawResult::response(204, secs(0.1)), NOW, &thresholds);
        assert_eq!(eval.verdict, HealthVerdict::Unreachable);

        let eval = evaluate(&RawResult::response(200, secs(1.0)), NOW, &thresholds);
        assert_eq!(eval.verdict, HealthVerdict::Degraded);
    }
}
