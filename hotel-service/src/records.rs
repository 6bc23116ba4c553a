//! Typed views over stored documents plus the store helpers every router
//! shares: id parsing, audit stamping, and store-error mapping.

use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{self, doc, oid::ObjectId, Document};
use common_store::{match_all_regex, update_and_stamp, DocumentStore, Page, StoreError, UpdateRequest};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::warn;

/// Created/updated stamps carried by every stored entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Audit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Audit {
    fn read(document: &Document) -> Self {
        let at = |key: &str| document.get_datetime(key).ok().map(|value| value.to_chrono());
        let by = |key: &str| document.get_str(key).ok().map(str::to_owned);
        Self {
            created_at: at("created_at"),
            created_by: by("created_by"),
            updated_at: at("updated_at"),
            updated_by: by("updated_by"),
        }
    }
}

/// A document read back from the store: its id, typed fields, and audit stamps.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
    #[serde(serialize_with = "hex_id")]
    pub id: ObjectId,
    #[serde(flatten)]
    pub data: T,
    #[serde(flatten)]
    pub audit: Audit,
}

impl<T: DeserializeOwned> Stored<T> {
    pub fn from_document(collection: &str, document: Document) -> ApiResult<Self> {
        let id = document
            .get_object_id("_id")
            .map_err(|err| ApiError::internal(format!("{collection} document without _id: {err}")))?;
        let audit = Audit::read(&document);
        let data = bson::from_document(document)
            .map_err(|err| ApiError::internal(format!("malformed {collection} document: {err}")))?;
        Ok(Self { id, data, audit })
    }
}

/// Reads a BSON datetime field and writes it back out as RFC 3339.
pub mod stored_datetime {
    use chrono::{DateTime, Utc};
    use common_store::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        bson::DateTime::deserialize(deserializer).map(|value| value.to_chrono())
    }
}

/// `{"$gte": from, "$lte": to}` over whichever bounds are given.
pub fn date_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Document> {
    let mut range = Document::new();
    if let Some(from) = from {
        range.insert("$gte", bson::DateTime::from_chrono(from));
    }
    if let Some(to) = to {
        range.insert("$lte", bson::DateTime::from_chrono(to));
    }
    (!range.is_empty()).then_some(range)
}

fn hex_id<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

/// `NotFound` keeps its meaning; anything else is a driver failure and is
/// hidden from the client.
pub fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound { collection } => {
            ApiError::not_found(format!("no document found in {collection}"))
        }
        other => {
            warn!(error = %other, "store operation failed");
            ApiError::internal(other)
        }
    }
}

/// Parses a hex ObjectId, reporting `invalid <name>=<value>` at `location`.
pub fn parse_object_id(value: &str, location: [&str; 2]) -> ApiResult<ObjectId> {
    ObjectId::parse_str(value.trim()).map_err(|_| {
        ApiError::unprocessable(format!("invalid {}={value}", location[1])).with_location(location)
    })
}

/// Case-insensitive "contains these characters in order" filter value.
pub fn name_pattern(query: &str) -> Document {
    doc! { "$regex": match_all_regex(query), "$options": "i" }
}

pub fn stamp(by: &ObjectId) -> Document {
    doc! {
        "updated_at": bson::DateTime::now(),
        "updated_by": by.to_hex(),
    }
}

pub async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: Document,
) -> ApiResult<Option<Stored<T>>> {
    match store.find_one(collection, filter).await.map_err(store_error)? {
        Some(document) => Stored::from_document(collection, document).map(Some),
        None => Ok(None),
    }
}

pub async fn fetch_by_id<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: ObjectId,
) -> ApiResult<Option<Stored<T>>> {
    fetch(store, collection, doc! { "_id": id }).await
}

/// Loads the document a path parameter names: 422 when the id is malformed,
/// 404 when nothing has it.
pub async fn load_from_path<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    raw_id: &str,
    param: &str,
    label: &str,
) -> ApiResult<Stored<T>> {
    let id = parse_object_id(raw_id, ["path parameter", param])?;
    fetch_by_id(store, collection, id).await?.ok_or_else(|| {
        ApiError::not_found(format!("no {label} found with an id={id}"))
            .with_location(["path parameter", param])
    })
}

pub async fn fetch_many<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: Document,
    page: Page,
) -> ApiResult<Vec<Stored<T>>> {
    store
        .find_many(collection, filter, page)
        .await
        .map_err(store_error)?
        .into_iter()
        .map(|document| Stored::from_document(collection, document))
        .collect()
}

pub async fn exists(
    store: &dyn DocumentStore,
    collection: &str,
    filter: Document,
) -> ApiResult<bool> {
    let total = store.count(collection, filter).await.map_err(store_error)?;
    Ok(total > 0)
}

/// Inserts `document` with all four audit fields set to `by` and now.
pub async fn insert_stamped(
    store: &dyn DocumentStore,
    collection: &str,
    mut document: Document,
    by: &ObjectId,
) -> ApiResult<ObjectId> {
    let now = bson::DateTime::now();
    document.insert("created_at", now);
    document.insert("created_by", by.to_hex());
    document.insert("updated_at", now);
    document.insert("updated_by", by.to_hex());
    store
        .insert_one(collection, document)
        .await
        .map_err(store_error)
}

/// Applies `request` to one document and stamps it. An update that changes
/// nothing is reported as `operation failed` with `failure`.
pub async fn apply_update(
    store: &dyn DocumentStore,
    collection: &str,
    id: ObjectId,
    request: &UpdateRequest,
    by: &ObjectId,
    failure: &str,
) -> ApiResult<()> {
    let modified = update_and_stamp(store, collection, id, request, stamp(by))
        .await
        .map_err(store_error)?;
    if modified {
        Ok(())
    } else {
        Err(ApiError::operation_failed(failure))
    }
}

/// `{"success": true, key: value}`
pub fn payload<T: Serialize>(key: &str, value: T) -> ApiResult<serde_json::Value> {
    let value = serde_json::to_value(value).map_err(ApiError::internal)?;
    let mut body = serde_json::Map::new();
    body.insert("success".to_string(), serde_json::Value::Bool(true));
    body.insert(key.to_string(), value);
    Ok(serde_json::Value::Object(body))
}

pub fn success() -> serde_json::Value {
    serde_json::json!({ "success": true })
}
