use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection};
use tracing::debug;

use super::{RecordStore, StoreBackend};
use crate::error::{Result, StoreError};
use crate::record::{Record, RecordFilter};

/// Record store backed by a MongoDB collection.
///
/// Documents are expected to carry the record fields at the top level;
/// extra fields such as `_id` are ignored.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<Record>,
    database: String,
}

impl MongoStore {
    /// Connect and ping the server so a bad URL fails at startup.
    pub async fn connect(url: &str, database: &str, collection: &str) -> Result<Self> {
        let connect_error = |e: mongodb::error::Error| StoreError::Connect {
            backend: StoreBackend::Mongodb.to_string(),
            message: e.to_string(),
        };

        let client = Client::with_uri_str(url).await.map_err(connect_error)?;
        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connect_error)?;

        let collection = client.database(database).collection::<Record>(collection);
        Ok(Self {
            client,
            collection,
            database: database.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Mongodb
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        self.query_by_filter(&RecordFilter::all()).await
    }

    async fn query_by_filter(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let document = filter_document(filter);
        debug!(filter = %document, "running mongodb record query");

        let cursor = self.collection.find(document).await?;
        Ok(cursor.try_collect::<Vec<Record>>().await?)
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }
}

/// Equality on the constrained fields; the other core fields must be
/// non-null so partial documents are never returned as observations.
fn filter_document(filter: &RecordFilter) -> Document {
    let mut document = doc! {
        "country_code": { "$ne": null },
        "indicator_code": { "$ne": null },
        "year": { "$ne": null },
    };
    for (field, value) in filter.conditions() {
        document.insert(field.column(), value);
    }
    document
}
