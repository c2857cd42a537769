use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::scrape::{ScrapeRequest, ScrapeResult};

#[derive(Clone)]
pub struct StoredPage {
    pub id: Uuid,
    pub request_url: String,
    pub response: ScrapeResult,
    pub created_at: DateTime<Utc>,
}

/// Exclusively owns the page cache; the only writer is whoever calls
/// `insert`/`cleanup_older_than`.
#[derive(Default)]
pub struct MemoryStore {
    pages: DashMap<Uuid, StoredPage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
        }
    }

    pub fn insert(&self, request: &ScrapeRequest, response: ScrapeResult) -> Uuid {
        let id = Uuid::new_v4();
        self.pages.insert(
            id,
            StoredPage {
                id,
                request_url: request.url.clone(),
                response,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn get(&self, id: Uuid) -> Option<StoredPage> {
        self.pages.get(&id).map(|e| e.value().clone())
    }

    /// Removes every entry with `now - createdAt >= ttl`, returning the count.
    pub fn cleanup_older_than(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(ttl).unwrap_or_default();
        let stale: Vec<Uuid> = self
            .pages
            .iter()
            .filter(|e| e.value().created_at <= cutoff)
            .map(|e| *e.key())
            .collect();
        for id in &stale {
            self.pages.remove(id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::{Mode, ScrapeMeta};

    fn sample_request() -> ScrapeRequest {
        ScrapeRequest {
            url: "http://x/a".to_string(),
            mode: Some(Mode::Static),
            task_timeout_secs: None,
            raw_body: None,
            fingerprint: None,
        }
    }

    fn sample_result() -> ScrapeResult {
        ScrapeResult {
            url: "http://x/a".to_string(),
            title: None,
            description: None,
            date: None,
            author: None,
            body: String::new(),
            meta: ScrapeMeta::default(),
        }
    }

    #[test]
    fn cleanup_zero_ttl_removes_everything() {
        let store = MemoryStore::new();
        store.insert(&sample_request(), sample_result());
        store.insert(&sample_request(), sample_result());
        assert_eq!(store.len(), 2);
        let removed = store.cleanup_older_than(Duration::from_secs(0));
        assert_eq!(removed, 2);
        assert!(store.is_empty());
    }
}
