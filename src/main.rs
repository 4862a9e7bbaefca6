//! Lookout monitor
//!
//! Run with: cargo run
//!
//! Environment variables (see `lookout::config` for the full list):
//! - TARGET_URL: Endpoint to probe (required)
//! - POLL_INTERVAL_SECONDS: Seconds between checks (default: 300)
//! - DEGRADED_LATENCY_SECONDS: Slow-response threshold (default: 3.0)
//! - STORE_CREDENTIALS / STORE_PATH: Observation store (default: in-memory)
//! - NOTIFIER_WEBHOOK_URL: Alert webhook (default: alerts are logged)
//! - API_BIND: Address for the read API (default: disabled)
//! - RUST_LOG: Log level (default: info)
//!
//! Exits 0 after Ctrl+C or SIGTERM, non-zero when configuration is missing or invalid.

use std::sync::Arc;

use lookout::alerts::{AlertDispatcher, LogNotifier, Notifier, WebhookNotifier};
use lookout::api::{self, AppState};
use lookout::config::{MonitorConfig, StoreConfig};
use lookout::probe::HttpProber;
use lookout::scheduler::Scheduler;
use lookout::storage::{FileStore, MemoryStore, ObservationStore, RemoteStore};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookout=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    tracing::info!("Lookout configuration:");
    tracing::info!("  Target: {}", config.target_url);
    tracing::info!("  Poll interval: {} seconds", config.poll_interval.as_secs());
    tracing::info!(
        "  Acceptable status codes: {:?}",
        config.thresholds.acceptable_codes
    );
    tracing::info!(
        "  Degraded latency: {} seconds",
        config.thresholds.degraded_latency.as_secs_f64()
    );
    tracing::info!("  Probe timeout: {:?}", config.probe_timeout);
    tracing::info!("  Store backlog capacity: {}", config.backlog_capacity);

    let store: Arc<dyn ObservationStore> = match &config.store {
        StoreConfig::Remote {
            base_url,
            credentials,
            collection,
        } => {
            tracing::info!("  Store: remote ({}, collection {})", base_url, collection);
            Arc::new(RemoteStore::new(
                base_url,
                credentials.expose(),
                collection,
                config.store_timeout,
            )?)
        }
        StoreConfig::File { path } => {
            tracing::info!("  Store: file ({})", path.display());
            Arc::new(FileStore::open(path).await?)
        }
        StoreConfig::Memory => {
            tracing::warn!("  Store: memory (observations are lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notifier_webhook_url {
        Some(url) => {
            tracing::info!("  Notifier: webhook");
            Arc::new(WebhookNotifier::new(url.expose()))
        }
        None => {
            tracing::warn!("  Notifier: log only (NOTIFIER_WEBHOOK_URL not set)");
            Arc::new(LogNotifier)
        }
    };

    let scheduler = Arc::new(
        Scheduler::new(
            config.target_url.clone(),
            Arc::new(HttpProber::new(config.probe_timeout)?),
            Arc::clone(&store),
            AlertDispatcher::new(notifier).with_timeout(config.notifier_timeout),
        )
        .with_interval(config.poll_interval)
        .with_thresholds(config.thresholds.clone())
        .with_probe_timeout(config.probe_timeout)
        .with_store_timeout(config.store_timeout)
        .with_backlog_capacity(config.backlog_capacity),
    );

    // Bind before starting the loop so a bad address fails startup
    let api_listener = match config.api_bind {
        Some(addr) => Some(api::bind(addr).await?),
        None => None,
    };

    println!(
        r#"
  _              _               _
 | |    ___  ___ | | _____  _   _| |_
 | |   / _ \/ _ \| |/ / _ \| | | | __|
 | |__| (_) | (_) |   < (_) | |_| | |_
 |_____\___/ \___/|_|\_\___/ \__,_|\__|

 HTTP Uptime Monitor
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    let handle = Arc::clone(&scheduler).start();

    let (api_shutdown_tx, api_shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let api_task = api_listener.map(|listener| {
        let state = Arc::new(AppState {
            store,
            status: scheduler.status_handle(),
            thresholds: config.thresholds.clone(),
        });
        tokio::spawn(api::serve(listener, state, async move {
            let _ = api_shutdown_rx.await;
        }))
    });

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received, stopping monitor...");

    handle.stop().await;
    let _ = api_shutdown_tx.send(());
    if let Some(task) = api_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Read API failed: {}", e),
            Err(e) => tracing::error!("Read API task failed: {}", e),
        }
    }

    tracing::info!("Lookout stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = ctrl_c => result,
        _ = terminate => Ok(()),
    }
}
