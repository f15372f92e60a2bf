//! [`StaticSource`]: a content source serving fixed records.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use shelf_core::{ContentSource, SourceError};
use shelf_schema::{ContentCategory, ContentRecord};

#[derive(Debug, Default)]
pub struct StaticSource {
    records: Mutex<HashMap<ContentCategory, Vec<ContentRecord>>>,
    failing: Mutex<HashSet<ContentCategory>>,
    fetches: Mutex<Vec<(String, ContentCategory, Option<usize>)>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source serving `records`, grouped by their category.
    pub fn with_records(records: Vec<ContentRecord>) -> Self {
        let source = Self::new();
        for record in records {
            source
                .records
                .lock()
                .unwrap()
                .entry(record.category)
                .or_default()
                .push(record);
        }
        source
    }

    /// Replace the records served for `category`.
    pub fn set_records(&self, category: ContentCategory, records: Vec<ContentRecord>) {
        self.records.lock().unwrap().insert(category, records);
    }

    pub fn fail_category(&self, category: ContentCategory) {
        self.failing.lock().unwrap().insert(category);
    }

    /// `(user, category, limit)` of every fetch, in order.
    pub fn fetches(&self) -> Vec<(String, ContentCategory, Option<usize>)> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn fetch(
        &self,
        user: &str,
        category: ContentCategory,
        limit: Option<usize>,
    ) -> Result<Vec<ContentRecord>, SourceError> {
        self.fetches
            .lock()
            .unwrap()
            .push((user.to_string(), category, limit));
        if self.failing.lock().unwrap().contains(&category) {
            return Err(SourceError::new(category, "catalog unavailable"));
        }

        let mut records = self
            .records
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}
