//! Read side of the observation log
//!
//! Presentation layers scan the whole store and filter client-side; the store
//! offers no time-range queries.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::alerts::Thresholds;
use crate::data::Observation;
use crate::storage::{ObservationStore, StoreError};

/// Half-open time range `[start, end)` in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The `window` ending at `now`
    pub fn last(window: Window, now: f64) -> Self {
        Self::new(now - window.seconds(), now)
    }

    /// `end` is exclusive
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// Preset look-back windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Day,
    Week,
    Month,
}

impl Window {
    pub fn seconds(&self) -> f64 {
        const DAY: f64 = 86_400.0;
        match self {
            Window::Day => DAY,
            Window::Week => 7.0 * DAY,
            Window::Month => 30.0 * DAY,
        }
    }
}

impl std::str::FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Window::Day),
            "week" => Ok(Window::Week),
            "month" => Ok(Window::Month),
            other => Err(format!("unknown window '{}'", other)),
        }
    }
}

/// Read every record by following cursors until the last page
pub async fn fetch_all(store: &dyn ObservationStore) -> Result<Vec<Observation>, StoreError> {
    let mut page = store.list_page(None).await?;
    let mut all = std::mem::take(&mut page.records);

    while let Some(cursor) = page.next_cursor.take() {
        page = store.list_page(Some(&cursor)).await?;
        if page.records.is_empty() && page.next_cursor.as_ref() == Some(&cursor) {
            return Err(StoreError::InvalidCursor(format!(
                "cursor {} did not advance",
                cursor
            )));
        }
        all.append(&mut page.records);
    }

    Ok(all)
}

/// Observations within `range`, in store order
pub async fn list_range(
    store: &dyn ObservationStore,
    range: TimeRange,
) -> Result<Vec<Observation>, StoreError> {
    let all = fetch_all(store).await?;
    Ok(filter_range(all, range))
}

pub fn filter_range(records: Vec<Observation>, range: TimeRange) -> Vec<Observation> {
    records
        .into_iter()
        .filter(|o| range.contains(o.timestamp))
        .collect()
}

/// Share of checks judged up on one UTC day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyUptime {
    pub date: NaiveDate,
    pub checks: usize,
    pub up: usize,
    pub ratio: f64,
}

/// Aggregate observations per UTC day using the primary "is it up" judgment
pub fn daily_uptime(records: &[Observation], thresholds: &Thresholds) -> Vec<DailyUptime> {
    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();

    for record in records {
        let Some(datetime) = record.datetime() else {
            continue;
        };
        let entry = days.entry(datetime.date_naive()).or_default();
        entry.0 += 1;
        if thresholds.is_up(record) {
            entry.1 += 1;
        }
    }

    days.into_iter()
        .map(|(date, (checks, up))| DailyUptime {
            date,
            checks,
            up,
            ratio: up as f64 / checks as f64,
        })
        .collect()
}
