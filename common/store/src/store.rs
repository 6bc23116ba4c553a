use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::error::StoreResult;

/// Pagination window applied to `find_many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub skip: u64,
}

impl Page {
    pub fn new(limit: i64, skip: u64) -> Self {
        Self { limit, skip }
    }

    /// A missing or non-positive limit falls back to `default_limit`.
    pub fn resolve(limit: Option<i64>, skip: Option<u64>, default_limit: i64) -> Self {
        let limit = match limit {
            Some(value) if value > 0 => value,
            _ => default_limit,
        };
        Self::new(limit, skip.unwrap_or(0))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(25, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

impl UpdateOutcome {
    pub fn was_modified(&self) -> bool {
        self.modified > 0
    }
}

/// Collection-addressed access to a document database.
///
/// Filters and update statements use MongoDB query/update syntax so the same
/// statement runs unchanged against every backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `document`, assigning an `_id` when it has none, and returns the id.
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<ObjectId>;

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> StoreResult<Vec<Document>>;

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Applies `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome>;

    async fn ping(&self) -> StoreResult<()>;

    async fn shutdown(&self);
}

pub async fn find_by_id(
    store: &dyn DocumentStore,
    collection: &str,
    id: ObjectId,
) -> StoreResult<Option<Document>> {
    store.find_one(collection, doc! { "_id": id }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_resolve_falls_back_to_default_limit() {
        assert_eq!(Page::resolve(None, None, 25), Page::new(25, 0));
        assert_eq!(Page::resolve(Some(0), Some(10), 25), Page::new(25, 10));
        assert_eq!(Page::resolve(Some(-3), None, 25), Page::new(25, 0));
        assert_eq!(Page::resolve(Some(5), Some(2), 25), Page::new(5, 2));
    }

    #[test]
    fn outcome_reports_modification() {
        assert!(!UpdateOutcome { matched: 1, modified: 0 }.was_modified());
        assert!(UpdateOutcome { matched: 1, modified: 1 }.was_modified());
    }
}
