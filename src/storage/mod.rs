//! Observation storage
//!
//! The store is an append-only, key-ordered log of observations that can be
//! scanned in pages. Backends:
//!
//! - [`MemoryStore`]: in-process, lost on exit
//! - [`FileStore`]: JSON lines on local disk
//! - [`RemoteStore`]: hosted document base over HTTP

pub mod file;
pub mod memory;
pub mod remote;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::data::Observation;

/// Records returned per page unless a backend is configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for observation stores
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Append one observation
    async fn append(&self, record: &Observation) -> Result<(), StoreError>;

    /// Read one page in key order, starting after `cursor` (or at the
    /// beginning). The last page has no `next_cursor`.
    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<Page, StoreError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Opaque pagination position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub records: Vec<Observation>,
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected request: {0}")]
    Rejected(String),

    #[error("Store request timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
