use std::collections::BTreeMap;

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// Logical partial-update intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    /// Replace each field with the given value.
    #[default]
    Set,
    /// Add list values that are not already present.
    AppendUnique,
    /// Remove list values from the stored collection.
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Set => "set",
            Operation::AppendUnique => "push",
            Operation::Remove => "pull",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    One(Bson),
    Many(Vec<Bson>),
}

impl From<Bson> for FieldValue {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Array(values) => FieldValue::Many(values),
            other => FieldValue::One(other),
        }
    }
}

impl FieldValue {
    fn into_bson(self) -> Bson {
        match self {
            FieldValue::One(value) => value,
            FieldValue::Many(values) => Bson::Array(values),
        }
    }
}

/// Field/value mapping tagged with the operation that applies it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateRequest {
    operation: Operation,
    fields: BTreeMap<String, FieldValue>,
}

impl UpdateRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            fields: BTreeMap::new(),
        }
    }

    pub fn set() -> Self {
        Self::new(Operation::Set)
    }

    pub fn append_unique() -> Self {
        Self::new(Operation::AppendUnique)
    }

    pub fn remove() -> Self {
        Self::new(Operation::Remove)
    }

    /// Builds a request from every field of `document`.
    pub fn from_document(operation: Operation, document: Document) -> Self {
        let fields = document
            .into_iter()
            .map(|(key, value)| (key, FieldValue::from(value)))
            .collect();
        Self { operation, fields }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::from(value.into()));
        self
    }

    pub fn values<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.fields.insert(name.into(), FieldValue::Many(values));
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn translate(&self) -> Document {
        translate(self.operation, &self.fields)
    }
}

/// Maps an operation and its fields onto a MongoDB update statement.
///
/// Under `AppendUnique` scalars are set in place; under `Remove` a scalar is
/// pulled as a single member.
pub fn translate(operation: Operation, fields: &BTreeMap<String, FieldValue>) -> Document {
    let mut set = Document::new();
    let mut add_to_set = Document::new();
    let mut pull = Document::new();

    for (name, value) in fields {
        match (operation, value.clone()) {
            (Operation::Set, value) => {
                set.insert(name.clone(), value.into_bson());
            }
            (Operation::AppendUnique, FieldValue::Many(values)) => {
                add_to_set.insert(name.clone(), doc! { "$each": values });
            }
            (Operation::AppendUnique, FieldValue::One(value)) => {
                set.insert(name.clone(), value);
            }
            (Operation::Remove, FieldValue::Many(values)) => {
                pull.insert(name.clone(), doc! { "$in": values });
            }
            (Operation::Remove, FieldValue::One(value)) => {
                pull.insert(name.clone(), value);
            }
        }
    }

    let mut statement = Document::new();
    if !set.is_empty() {
        statement.insert("$set", set);
    }
    if !add_to_set.is_empty() {
        statement.insert("$addToSet", add_to_set);
    }
    if !pull.is_empty() {
        statement.insert("$pull", pull);
    }
    statement
}

/// Applies `request` to the document with `id`.
///
/// Fails with `NotFound` when no such document exists and returns whether any
/// stored value actually changed.
pub async fn update_one(
    store: &dyn DocumentStore,
    collection: &str,
    id: ObjectId,
    request: &UpdateRequest,
) -> StoreResult<bool> {
    let filter = doc! { "_id": id };
    if store.find_one(collection, filter.clone()).await?.is_none() {
        return Err(StoreError::not_found(collection));
    }
    if request.is_empty() {
        return Ok(false);
    }

    let outcome = store
        .update_one(collection, filter, request.translate())
        .await?;
    debug!(
        collection,
        %id,
        operation = request.operation().as_str(),
        modified = outcome.modified,
        "applied update"
    );
    Ok(outcome.was_modified())
}

/// Like [`update_one`], then writes `stamp` with `$set` only when the update
/// modified the document.
pub async fn update_and_stamp(
    store: &dyn DocumentStore,
    collection: &str,
    id: ObjectId,
    request: &UpdateRequest,
    stamp: Document,
) -> StoreResult<bool> {
    let modified = update_one(store, collection, id, request).await?;
    if modified && !stamp.is_empty() {
        store
            .update_one(collection, doc! { "_id": id }, doc! { "$set": stamp })
            .await?;
    }
    Ok(modified)
}
