//! HTTP client for a hosted key-ordered document base
//!
//! Items are written with `PUT {base}/{project}/{collection}/items` and
//! scanned with `POST {base}/{project}/{collection}/query`, paging on the
//! `last` key the service returns. The project id is the prefix of the
//! project key before its first underscore.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Cursor, ObservationStore, Page, StoreError, DEFAULT_PAGE_SIZE};
use crate::data::Observation;

pub const DEFAULT_BASE_URL: &str = "https://database.deta.sh/v1";
pub const DEFAULT_COLLECTION: &str = "server_health";

const API_KEY_HEADER: &str = "X-API-Key";

pub struct RemoteStore {
    client: reqwest::Client,
    collection_url: String,
    api_key: String,
    page_size: usize,
}

#[derive(Serialize)]
struct PutItemsRequest<'a> {
    items: [StoredItem<'a>; 1],
}

#[derive(Serialize)]
struct StoredItem<'a> {
    key: String,
    #[serde(flatten)]
    observation: &'a Observation,
}

#[derive(Deserialize, Default)]
struct PutItemsResponse {
    #[serde(default)]
    failed: Option<FailedItems>,
}

#[derive(Deserialize, Default)]
struct FailedItems {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    paging: Paging,
    #[serde(default)]
    items: Vec<Observation>,
}

#[derive(Deserialize, Default)]
struct Paging {
    #[serde(default)]
    last: Option<String>,
}

impl RemoteStore {
    pub fn new(
        base_url: &str,
        project_key: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let project_id = match project_key.split_once('_') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => id,
            _ => {
                return Err(StoreError::InvalidCredentials(
                    "project key must look like <project id>_<secret>".to_string(),
                ))
            }
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            collection_url: format!(
                "{}/{}/{}",
                base_url.trim_end_matches('/'),
                project_id,
                collection
            ),
            api_key: project_key.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Item key: zero-padded microseconds, so key order is time order
    fn item_key(observation: &Observation) -> String {
        let micros = (observation.timestamp.max(0.0) * 1_000_000.0).round() as u64;
        format!("{:020}", micros)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(StoreError::Unavailable(format!("status {}: {}", status, body)))
        } else {
            Err(StoreError::Rejected(format!("status {}: {}", status, body)))
        }
    }
}

fn map_request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl ObservationStore for RemoteStore {
    async fn append(&self, record: &Observation) -> Result<(), StoreError> {
        let request = PutItemsRequest {
            items: [StoredItem {
                key: Self::item_key(record),
                observation: record,
            }],
        };

        let response = self
            .client
            .put(format!("{}/items", self.collection_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = Self::check_status(response).await?;

        let body: PutItemsResponse = response.json().await.unwrap_or_default();
        if let Some(failed) = body.failed {
            if !failed.items.is_empty() {
                return Err(StoreError::Rejected(format!(
                    "{} item(s) failed to store",
                    failed.items.len()
                )));
            }
        }

        Ok(())
    }

    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<Page, StoreError> {
        let request = QueryRequest {
            limit: self.page_size,
            last: cursor.map(Cursor::as_str),
        };

        let response = self
            .client
            .post(format!("{}/query", self.collection_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = Self::check_status(response).await?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Page {
            records: body.items,
            next_cursor: body.paging.last.map(Cursor::new),
        })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
