use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::Thresholds;
use crate::data::Observation;
use crate::history::{self, DailyUptime, TimeRange, Window};
use crate::scheduler::{now_timestamp, MonitorStatus};
use crate::storage::{Cursor, ObservationStore, Page, StoreError};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn ObservationStore>,
    pub status: Arc<RwLock<MonitorStatus>>,
    pub thresholds: Thresholds,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Monitor Status
// ============================================================================

pub async fn monitor_status(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.status.read().clone())
}

// ============================================================================
// Observations
// ============================================================================

#[derive(Deserialize)]
pub struct PageParams {
    pub cursor: Option<String>,
}

pub async fn list_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page>, ApiError> {
    let cursor = params.cursor.map(Cursor::new);
    let page = state.store.list_page(cursor.as_ref()).await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
pub struct RangeParams {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub window: Option<Window>,
}

#[derive(Serialize)]
pub struct RangeResponse {
    pub range: TimeRange,
    pub count: usize,
    pub observations: Vec<Observation>,
}

pub async fn list_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<RangeResponse>, ApiError> {
    let range = match params.window {
        Some(window) => TimeRange::last(window, now_timestamp()),
        None => TimeRange::new(params.start.unwrap_or(0.0), params.end.unwrap_or(f64::MAX)),
    };
    if range.start >= range.end {
        return Err(ApiError::BadRequest(
            "start must be before end".to_string(),
        ));
    }

    let observations = history::list_range(state.store.as_ref(), range).await?;

    Ok(Json(RangeResponse {
        range,
        count: observations.len(),
        observations,
    }))
}

// ============================================================================
// Uptime
// ============================================================================

#[derive(Deserialize)]
pub struct UptimeParams {
    pub window: Option<Window>,
}

#[derive(Serialize)]
pub struct UptimeResponse {
    pub window: Window,
    pub checks: usize,
    pub up: usize,
    pub days: Vec<DailyUptime>,
}

pub async fn uptime(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UptimeParams>,
) -> Result<Json<UptimeResponse>, ApiError> {
    let window = params.window.unwrap_or(Window::Week);
    let range = TimeRange::last(window, now_timestamp());

    let observations = history::list_range(state.store.as_ref(), range).await?;
    let days = history::daily_uptime(&observations, &state.thresholds);

    Ok(Json(UptimeResponse {
        window,
        checks: days.iter().map(|d| d.checks).sum(),
        up: days.iter().map(|d| d.up).sum(),
        days,
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidCursor(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
