//! Monitor configuration from environment variables
//!
//! - `TARGET_URL` (required): endpoint to probe
//! - `POLL_INTERVAL_SECONDS`: seconds between tick starts (default: 300)
//! - `SUCCESS_STATUS_CODES`: acceptable codes (default: 200,204)
//! - `HEALTHY_STATUS_CODES`: primary "up" codes (default: 200)
//! - `DEGRADED_LATENCY_SECONDS`: slow-response threshold (default: 3.0)
//! - `STORE_CREDENTIALS`: project key; selects the remote store
//! - `STORE_URL`, `STORE_NAME`: remote store location
//! - `STORE_PATH`: JSON-lines file; selects the file store
//! - `STORE_BACKLOG_CAPACITY`: failed writes kept for retry (default: 32)
//! - `NOTIFIER_WEBHOOK_URL`: alert webhook; alerts are only logged if unset
//! - `PROBE_TIMEOUT_SECONDS`, `STORE_TIMEOUT_SECONDS`,
//!   `NOTIFIER_TIMEOUT_SECONDS`: per-call bounds (default: 10)
//! - `API_BIND`: address for the read API; disabled if unset

use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::alerts::Thresholds;
use crate::scheduler::{DEFAULT_INTERVAL, MAX_INTERVAL};
use crate::storage::remote::{DEFAULT_BASE_URL, DEFAULT_COLLECTION};

/// Value that must not appear in logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Which observation store to use
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Remote {
        base_url: String,
        credentials: Secret,
        collection: String,
    },
    File {
        path: PathBuf,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub target_url: String,
    pub poll_interval: Duration,
    pub thresholds: Thresholds,
    pub store: StoreConfig,
    pub store_timeout: Duration,
    pub backlog_capacity: usize,
    pub notifier_webhook_url: Option<Secret>,
    pub notifier_timeout: Duration,
    pub probe_timeout: Duration,
    pub api_bind: Option<SocketAddr>,
}

impl MonitorConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let target_url = get("TARGET_URL").ok_or(ConfigError::Missing("TARGET_URL"))?;
        reqwest::Url::parse(&target_url)
            .map_err(|e| ConfigError::invalid("TARGET_URL", &target_url, e))?;

        let poll_interval = match get("POLL_INTERVAL_SECONDS") {
            Some(v) => {
                let secs: u64 = parse("POLL_INTERVAL_SECONDS", &v)?;
                if secs == 0 {
                    return Err(ConfigError::invalid(
                        "POLL_INTERVAL_SECONDS",
                        &v,
                        "must be greater than zero",
                    ));
                }
                if secs > MAX_INTERVAL.as_secs() {
                    return Err(ConfigError::invalid(
                        "POLL_INTERVAL_SECONDS",
                        &v,
                        format!("must be at most {}", MAX_INTERVAL.as_secs()),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_INTERVAL,
        };

        let mut thresholds = Thresholds::default();
        if let Some(v) = get("SUCCESS_STATUS_CODES") {
            thresholds.acceptable_codes = parse_codes("SUCCESS_STATUS_CODES", &v)?;
        }
        if let Some(v) = get("HEALTHY_STATUS_CODES") {
            thresholds.healthy_codes = parse_codes("HEALTHY_STATUS_CODES", &v)?;
        }
        if let Some(v) = get("DEGRADED_LATENCY_SECONDS") {
            thresholds.degraded_latency = parse_seconds("DEGRADED_LATENCY_SECONDS", &v)?;
        }

        let store = match (get("STORE_CREDENTIALS"), get("STORE_PATH")) {
            (Some(credentials), _) => StoreConfig::Remote {
                base_url: get("STORE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                credentials: Secret::new(credentials),
                collection: get("STORE_NAME").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            },
            (None, Some(path)) => StoreConfig::File {
                path: PathBuf::from(path),
            },
            (None, None) => StoreConfig::Memory,
        };

        let backlog_capacity = match get("STORE_BACKLOG_CAPACITY") {
            Some(v) => parse("STORE_BACKLOG_CAPACITY", &v)?,
            None => 32,
        };

        let seconds_or_default = |name: &str| -> Result<Duration, ConfigError> {
            match get(name) {
                Some(v) => parse_seconds(name, &v),
                None => Ok(Duration::from_secs(10)),
            }
        };

        let api_bind = match get("API_BIND") {
            Some(v) => Some(parse("API_BIND", &v)?),
            None => None,
        };

        Ok(Self {
            target_url,
            poll_interval,
            thresholds,
            store,
            store_timeout: seconds_or_default("STORE_TIMEOUT_SECONDS")?,
            backlog_capacity,
            notifier_webhook_url: get("NOTIFIER_WEBHOOK_URL").map(Secret::new),
            notifier_timeout: seconds_or_default("NOTIFIER_TIMEOUT_SECONDS")?,
            probe_timeout: seconds_or_default("PROBE_TIMEOUT_SECONDS")?,
            api_bind,
        })
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::invalid(name, value, e))
}

fn parse_seconds(name: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = parse(name, value)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::invalid(name, value, "must be a positive number"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::invalid(name, value, e))
}

fn parse_codes(name: &str, value: &str) -> Result<BTreeSet<i32>, ConfigError> {
    let mut codes = BTreeSet::new();
    for part in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let code: i32 = parse(name, part)?;
        if !(100..=599).contains(&code) {
            return Err(ConfigError::invalid(name, value, "status codes must be 100-599"));
        }
        codes.insert(code);
    }
    if codes.is_empty() {
        return Err(ConfigError::invalid(name, value, "no status codes given"));
    }
    Ok(codes)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name} ({value:?}): {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &str, value: &str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("TARGET_URL", "https://example.com/login")]).unwrap();

        assert_eq!(config.target_url, "https://example.com/login");
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.backlog_capacity, 32);
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.notifier_webhook_url.is_none());
        assert!(config.api_bind.is_none());
    }

    #[test]
    fn test_missing_target_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TARGET_URL")));

        let err = load(&[("TARGET_URL", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TARGET_URL")));
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("TARGET_URL", "not a url"),
            ("POLL_INTERVAL_SECONDS", "0"),
            ("POLL_INTERVAL_SECONDS", "five"),
            ("SUCCESS_STATUS_CODES", "200,abc"),
            ("SUCCESS_STATUS_CODES", "42"),
            ("HEALTHY_STATUS_CODES", "200;204"),
            ("HEALTHY_STATUS_CODES", "600"),
            ("HEALTHY_STATUS_CODES", " , "),
            ("DEGRADED_LATENCY_SECONDS", "-1"),
            ("API_BIND", "localhost"),
        ] {
            let mut vars = vec![("TARGET_URL", "http://example.com")];
            vars.retain(|(k, _)| *k != name);
            vars.push((name, value));

            let err = load(&vars).unwrap_err();
            match err {
                ConfigError::Invalid { name: got, .. } => assert_eq!(got, name),
                other => panic!("expected invalid {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TARGET_URL", "http://example.com"),
            ("POLL_INTERVAL_SECONDS", "60"),
            ("SUCCESS_STATUS_CODES", "200, 204, 301"),
            ("DEGRADED_LATENCY_SECONDS", "1.5"),
            ("STORE_PATH", "/var/lib/lookout/health.jsonl"),
            ("NOTIFIER_WEBHOOK_URL", "https://hooks.example.com/abc"),
            ("API_BIND", "127.0.0.1:8080"),
        ])
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(
            config.thresholds.acceptable_codes,
            BTreeSet::from([200, 204, 301])
        );
        assert_eq!(config.thresholds.degraded_latency, Duration::from_millis(1500));
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: PathBuf::from("/var/lib/lookout/health.jsonl")
            }
        );
        assert_eq!(
            config.notifier_webhook_url.as_ref().map(Secret::expose),
            Some("https://hooks.example.com/abc")
        );
        assert_eq!(config.api_bind, Some("127.0.0.1:8080".parse().unwrap()));
    }

    #[test]
    fn test_poll_interval_upper_bound() {
        let year = MAX_INTERVAL.as_secs().to_string();
        let config = load(&[
            ("TARGET_URL", "http://example.com"),
            ("POLL_INTERVAL_SECONDS", year.as_str()),
        ])
        .unwrap();
        assert_eq!(config.poll_interval, MAX_INTERVAL);

        let too_long = (MAX_INTERVAL.as_secs() + 1).to_string();
        for value in [too_long.as_str(), "18446744073709551615"] {
            let err = load(&[
                ("TARGET_URL", "http://example.com"),
                ("POLL_INTERVAL_SECONDS", value),
            ])
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { ref name, .. } if name == "POLL_INTERVAL_SECONDS"),
                "accepted interval {}",
                value
            );
        }
    }

    #[test]
    fn test_healthy_codes_override() {
        let config = load(&[
            ("TARGET_URL", "http://example.com"),
            ("HEALTHY_STATUS_CODES", "200,204"),
        ])
        .unwrap();

        assert_eq!(config.thresholds.healthy_codes, BTreeSet::from([200, 204]));
        assert_eq!(
            config.thresholds.acceptable_codes,
            Thresholds::default().acceptable_codes
        );
        let no_content = crate::data::Observation::new(0.0, Some(204), Some(0.5));
        assert!(config.thresholds.is_up(&no_content));
    }

    #[test]
    fn test_credentials_select_remote_and_stay_hidden() {
        let config = load(&[
            ("TARGET_URL", "http://example.com"),
            ("STORE_CREDENTIALS", "abc_supersecret"),
            ("STORE_PATH", "ignored.jsonl"),
        ])
        .unwrap();

        match &config.store {
            StoreConfig::Remote {
                base_url,
                credentials,
                collection,
            } => {
                assert_eq!(base_url, DEFAULT_BASE_URL);
                assert_eq!(collection, DEFAULT_COLLECTION);
                assert_eq!(credentials.expose(), "abc_supersecret");
            }
            other => panic!("expected remote store, got {:?}", other),
        }
        assert!(!format!("{:?}", config).contains("supersecret"));
    }
}
