use mongodb::bson;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document in '{collection}' matched the given id")]
    NotFound { collection: String },
    #[error("document in '{0}' has no ObjectId '_id' field")]
    MissingId(String),
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    #[error("invalid regular expression '{0}'")]
    InvalidPattern(String),
    #[error("failed to encode or decode document: {0}")]
    Serialization(String),
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Database(value.to_string())
    }
}

impl From<bson::ser::Error> for StoreError {
    fn from(value: bson::ser::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(value: bson::de::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}
