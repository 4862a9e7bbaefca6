//! Lookout: HTTP uptime monitor
//!
//! Probes one HTTP endpoint on a fixed interval, records every outcome to an
//! append-only observation store and raises alerts through a webhook when the
//! endpoint is slow or down.
//!
//! # Features
//!
//! - **Fixed-Rate Scheduling**: ticks start one interval apart and never overlap
//! - **Total Classification**: every probe maps to healthy, degraded or unreachable
//! - **Failure Isolation**: store, notifier and probe failures never stop the loop
//! - **Write Backlog**: failed observations are retried in order on later ticks
//! - **Pluggable Stores**: in-memory, JSON-lines file, or hosted document base
//! - **Read API**: paginated history, time-range filtering and daily uptime
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lookout::alerts::{AlertDispatcher, LogNotifier};
//! use lookout::probe::HttpProber;
//! use lookout::scheduler::Scheduler;
//! use lookout::storage::MemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = Arc::new(
//!     Scheduler::new(
//!         "https://example.com/login",
//!         Arc::new(HttpProber::new(Duration::from_secs(10))?),
//!         Arc::new(MemoryStore::new()),
//!         AlertDispatcher::new(Arc::new(LogNotifier)),
//!     )
//!     .with_interval(Duration::from_secs(300)),
//! );
//!
//! let handle = scheduler.start();
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod data;
pub mod history;
pub mod probe;
pub mod scheduler;
pub mod storage;

// Re-export commonly used types
pub use alerts::{evaluate, AlertMessage, Evaluation, HealthVerdict, Thresholds};
pub use config::{ConfigError, MonitorConfig};
pub use data::Observation;
pub use probe::RawResult;
pub use scheduler::Scheduler;
pub use storage::{ObservationStore, StoreError};
