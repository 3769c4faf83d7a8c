use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Client, Collection,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PersistError, Result};
use crate::{PipelineRecord, PipelineStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PipelineDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    /// Stored as a JSON string so the layout survives key characters BSON
    /// object keys reject (dots, leading dollars).
    blocks: String,
    // BSON datetimes, so $set with bson::DateTime::now() stays readable
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: chrono::DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: chrono::DateTime<Utc>,
}

impl PipelineDocument {
    fn into_record(self) -> PipelineRecord {
        let blocks = serde_json::from_str(&self.blocks)
            .unwrap_or_else(|_| serde_json::json!({ "raw": self.blocks }));
        PipelineRecord {
            id: self.id.to_hex(),
            name: self.name,
            blocks,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// MongoDB-backed pipeline store.
#[derive(Clone)]
pub struct MongoPipelineStore {
    collection: Collection<PipelineDocument>,
}

impl MongoPipelineStore {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("pipelines");
        Self { collection }
    }

    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::new(&client, db_name))
    }

    fn parse_id(id: &str) -> Result<ObjectId> {
        id.parse()
            .map_err(|_| PersistError::PipelineNotFound(id.to_string()))
    }

    fn encode_blocks(blocks: &Value) -> Result<String> {
        serde_json::to_string(blocks).map_err(|e| PersistError::Internal(e.to_string()))
    }
}

#[async_trait]
impl PipelineStore for MongoPipelineStore {
    async fn create(&self, name: String, blocks: Value) -> Result<PipelineRecord> {
        let now = Utc::now();
        let document = PipelineDocument {
            id: ObjectId::new(),
            name,
            blocks: Self::encode_blocks(&blocks)?,
            created_at: now,
            updated_at: now,
        };

        self.collection.insert_one(&document).await?;
        Ok(document.into_record())
    }

    async fn get(&self, id: &str) -> Result<Option<PipelineRecord>> {
        let object_id = match Self::parse_id(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        let document = self.collection.find_one(doc! { "_id": object_id }).await?;
        Ok(document.map(PipelineDocument::into_record))
    }

    async fn list(&self) -> Result<Vec<PipelineRecord>> {
        let documents: Vec<PipelineDocument> = self
            .collection
            .find(doc! {})
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(documents
            .into_iter()
            .map(PipelineDocument::into_record)
            .collect())
    }

    async fn update(&self, id: &str, name: String, blocks: Value) -> Result<PipelineRecord> {
        let object_id = Self::parse_id(id)?;
        let update = doc! {
            "$set": {
                "name": &name,
                "blocks": Self::encode_blocks(&blocks)?,
                "updated_at": bson::DateTime::now(),
            }
        };

        let result = self
            .collection
            .update_one(doc! { "_id": object_id }, update)
            .await?;
        if result.matched_count == 0 {
            return Err(PersistError::PipelineNotFound(id.to_string()));
        }

        self.collection
            .find_one(doc! { "_id": object_id })
            .await?
            .map(PipelineDocument::into_record)
            .ok_or_else(|| PersistError::PipelineNotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let object_id = Self::parse_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": object_id }).await?;
        if result.deleted_count == 0 {
            return Err(PersistError::PipelineNotFound(id.to_string()));
        }
        Ok(())
    }
}
