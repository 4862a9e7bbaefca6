//! HTTP GET prober backed by reqwest

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Prober, RawResult, TransportErrorKind};

/// Default bound on a single probe request
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Prober issuing one GET per call, with a request timeout and no retry
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target_url: &str) -> RawResult {
        let started = Instant::now();

        match self.client.get(target_url).send().await {
            Ok(response) => {
                // Measured at response head, like the body-less elapsed time
                // most HTTP clients report.
                let elapsed = started.elapsed();
                RawResult::response(i32::from(response.status().as_u16()), elapsed)
            }
            Err(e) => {
                let kind = classify_error(&e);
                tracing::debug!(
                    url = %target_url,
                    error = %e,
                    kind = %kind,
                    "Probe request failed"
                );
                RawResult::failed(kind)
            }
        }
    }
}

/// Map a reqwest failure onto the transport error taxonomy
fn classify_error(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }

    let mut description = err.to_string().to_lowercase();
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    return TransportErrorKind::ConnectionRefused
                }
                std::io::ErrorKind::TimedOut => return TransportErrorKind::Timeout,
                _ => {}
            }
        }
        description.push_str(": ");
        description.push_str(&cause.to_string().to_lowercase());
        source = cause.source();
    }

    if description.contains("dns error")
        || description.contains("failed to lookup address")
        || description.contains("name or service not known")
    {
        TransportErrorKind::Dns
    } else if description.contains("certificate")
        || description.contains("tls")
        || description.contains("ssl")
        || description.contains("handshake")
    {
        TransportErrorKind::Tls
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    async fn spawn_target(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_probe_ok() {
        let base = spawn_target(Router::new().route("/login", get(|| async { "ok" }))).await;
        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();

        let raw = prober.probe(&format!("{}/login", base)).await;

        assert_eq!(raw.status_code, Some(200));
        assert!(raw.response_time.is_some());
        assert!(raw.transport_error.is_none());
    }

    #[tokio::test]
    async fn test_probe_error_status_is_a_response() {
        let base = spawn_target(Router::new().route(
            "/",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();

        let raw = prober.probe(&format!("{}/", base)).await;

        assert_eq!(raw.status_code, Some(503));
        assert!(raw.transport_error.is_none());
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        // Grab a free port and release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new(Duration::from_secs(5)).unwrap();
        let raw = prober.probe(&format!("http://{}/", addr)).await;

        assert_eq!(raw.status_code, None);
        assert_eq!(raw.response_time, None);
        assert!(matches!(
            raw.transport_error,
            Some(TransportErrorKind::ConnectionRefused) | Some(TransportErrorKind::Connect)
        ));
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let base = spawn_target(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;
        let prober = HttpProber::new(Duration::from_millis(100)).unwrap();

        let raw = prober.probe(&format!("{}/slow", base)).await;

        assert_eq!(raw.transport_error, Some(TransportErrorKind::Timeout));
        assert_eq!(raw.status_code, None);
    }

    #[tokio::test]
    async fn test_probe_invalid_url() {
        let prober = HttpProber::new(Duration::from_secs(1)).unwrap();
        let raw = prober.probe("not a url").await;

        assert_eq!(raw.transport_error, Some(TransportErrorKind::Request));
    }
}
