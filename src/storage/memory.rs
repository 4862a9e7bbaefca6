//! In-process observation store

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Cursor, ObservationStore, Page, StoreError, DEFAULT_PAGE_SIZE};
use crate::data::Observation;

/// Vector-backed store; the cursor is the index of the next record
pub struct MemoryStore {
    records: RwLock<Vec<Observation>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every stored record
    pub fn snapshot(&self) -> Vec<Observation> {
        self.records.read().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn append(&self, record: &Observation) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<Page, StoreError> {
        let start = match cursor {
            Some(c) => c
                .as_str()
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidCursor(c.to_string()))?,
            None => 0,
        };

        let records = self.records.read();
        if start >= records.len() {
            return Ok(Page::default());
        }

        let end = (start + self.page_size).min(records.len());
        let next_cursor = (end < records.len()).then(|| Cursor::new(end.to_string()));

        Ok(Page {
            records: records[start..end].to_vec(),
            next_cursor,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ts: f64) -> Observation {
        Observation::new(ts, Some(200), Some(0.1))
    }

    #[tokio::test]
    async fn test_pagination_visits_every_record_in_order() {
        let store = MemoryStore::with_page_size(3);
        for i in 0..7 {
            store.append(&obs(i as f64)).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut pages = 0;
        let mut cursor = None;
        loop {
            let page = store.list_page(cursor.as_ref()).await.unwrap();
            pages += 1;
            seen.extend(page.records.iter().map(|o| o.timestamp));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_has_no_trailing_cursor() {
        let store = MemoryStore::with_page_size(2);
        store.append(&obs(1.0)).await.unwrap();
        store.append(&obs(2.0)).await.unwrap();

        let page = store.list_page(None).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryStore::new();
        let page = store.list_page(None).await.unwrap();
        assert!(page.records.is_empty());
        assert!(page.next_cursor.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_cursor() {
        let store = MemoryStore::new();
        let err = store.list_page(Some(&Cursor::new("abc"))).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor(_)));
    }
}
