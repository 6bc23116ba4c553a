use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Database};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, Page, UpdateOutcome};

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
    pub server_selection_timeout: Duration,
}

impl MongoConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            server_selection_timeout: Duration::from_secs(5),
        }
    }
}

/// MongoDB-backed store. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(&config.url).await?;
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.app_name = Some("hotel-service".to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);
        info!(database = %config.database, "MongoDB client initialised");
        Ok(Self { client, database })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<ObjectId> {
        let result = self
            .database
            .collection::<Document>(collection)
            .insert_one(document, None)
            .await?;
        match result.inserted_id {
            Bson::ObjectId(id) => Ok(id),
            _ => Err(StoreError::MissingId(collection.to_owned())),
        }
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        let found = self
            .database
            .collection::<Document>(collection)
            .find_one(filter, None)
            .await?;
        Ok(found)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> StoreResult<Vec<Document>> {
        let options = FindOptions::builder()
            .limit(page.limit)
            .skip(page.skip)
            .build();
        let mut cursor = self
            .database
            .collection::<Document>(collection)
            .find(filter, options)
            .await?;

        let mut documents = Vec::new();
        while cursor.advance().await? {
            documents.push(cursor.deserialize_current()?);
        }
        debug!(collection, returned = documents.len(), "find_many completed");
        Ok(documents)
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let total = self
            .database
            .collection::<Document>(collection)
            .count_documents(filter, None)
            .await?;
        Ok(total)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        let result = self
            .database
            .collection::<Document>(collection)
            .update_one(filter, update, None)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB client shut down");
    }
}
