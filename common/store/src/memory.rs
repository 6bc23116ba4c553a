use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::filter::{matches, values_equal};
use crate::store::{DocumentStore, Page, UpdateOutcome};

/// Process-local store used by tests and local runs without a database.
///
/// Documents keep insertion order; filters and update statements follow the
/// MongoDB subset the service emits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: &str) -> usize {
        let guard = self.collections.read().await;
        guard.get(collection).map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<ObjectId> {
        let existing = match document.get("_id") {
            Some(Bson::ObjectId(id)) => Some(*id),
            Some(_) => return Err(StoreError::MissingId(collection.to_owned())),
            None => None,
        };
        let (id, stored) = match existing {
            Some(id) => (id, document),
            None => {
                let id = ObjectId::new();
                let mut stored = Document::new();
                stored.insert("_id", id);
                for (key, value) in document {
                    stored.insert(key, value);
                }
                (id, stored)
            }
        };

        let mut guard = self.collections.write().await;
        guard.entry(collection.to_owned()).or_default().push(stored);
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        let guard = self.collections.read().await;
        let Some(documents) = guard.get(collection) else {
            return Ok(None);
        };
        for document in documents {
            if matches(document, &filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> StoreResult<Vec<Document>> {
        let guard = self.collections.read().await;
        let Some(documents) = guard.get(collection) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for document in documents {
            if matches(document, &filter)? {
                found.push(document);
            }
        }

        let limit = if page.limit > 0 {
            page.limit as usize
        } else {
            usize::MAX
        };
        Ok(found
            .into_iter()
            .skip(page.skip as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let guard = self.collections.read().await;
        let Some(documents) = guard.get(collection) else {
            return Ok(0);
        };
        let mut total = 0;
        for document in documents {
            if matches(document, &filter)? {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        let mut guard = self.collections.write().await;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        for document in documents.iter_mut() {
            if !matches(document, &filter)? {
                continue;
            }
            let mut updated = document.clone();
            apply_update(&mut updated, &update)?;
            let modified = updated != *document;
            if modified {
                *document = updated;
            }
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
            });
        }
        Ok(UpdateOutcome::default())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn shutdown(&self) {}
}

fn apply_update(document: &mut Document, update: &Document) -> StoreResult<()> {
    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(StoreError::InvalidUpdate(format!(
                "{operator} expects a document of fields"
            )));
        };
        for (field, argument) in fields {
            match operator.as_str() {
                "$set" => {
                    document.insert(field.clone(), argument.clone());
                }
                "$addToSet" => append(document, field, each_values(argument), true)?,
                "$push" => append(document, field, each_values(argument), false)?,
                "$pull" => pull(document, field, argument)?,
                other => return Err(StoreError::UnsupportedOperator(other.to_owned())),
            }
        }
    }
    Ok(())
}

fn each_values(argument: &Bson) -> Vec<Bson> {
    match argument {
        Bson::Document(spec) => match spec.get("$each") {
            Some(Bson::Array(values)) => values.clone(),
            _ => vec![argument.clone()],
        },
        other => vec![other.clone()],
    }
}

fn append(document: &mut Document, field: &str, values: Vec<Bson>, unique: bool) -> StoreResult<()> {
    let entry = document
        .entry(field.to_owned())
        .or_insert_with(|| Bson::Array(Vec::new()));
    let Bson::Array(items) = entry else {
        return Err(StoreError::InvalidUpdate(format!(
            "cannot append to non-array field '{field}'"
        )));
    };
    for value in values {
        if unique && items.iter().any(|item| values_equal(item, &value)) {
            continue;
        }
        items.push(value);
    }
    Ok(())
}

fn pull(document: &mut Document, field: &str, condition: &Bson) -> StoreResult<()> {
    let Some(entry) = document.get_mut(field) else {
        return Ok(());
    };
    let Bson::Array(items) = entry else {
        return Err(StoreError::InvalidUpdate(format!(
            "cannot pull from non-array field '{field}'"
        )));
    };

    let removed: Vec<Bson> = match condition {
        Bson::Document(spec) => match spec.get("$in") {
            Some(Bson::Array(values)) => values.clone(),
            _ => vec![condition.clone()],
        },
        other => vec![other.clone()],
    };
    items.retain(|item| !removed.iter().any(|value| values_equal(item, value)));
    Ok(())
}
