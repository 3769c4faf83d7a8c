//! Pipeline definition storage.
//!
//! A pipeline record is a named layout document: the graph the canvas built
//! plus whatever presentation metadata it carries, stored opaquely as JSON.
//! The engine never reads this crate; the HTTP surface uses it to load the
//! graph it hands to an execution.

pub mod error;
mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::{PersistError, Result};
pub use memory::MemoryPipelineStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoPipelineStore;

/// One persisted pipeline definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: String,
    pub name: String,
    /// Opaque layout document (nodes, edges, canvas metadata).
    pub blocks: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CRUD contract for pipeline definitions.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn create(&self, name: String, blocks: Value) -> Result<PipelineRecord>;
    async fn get(&self, id: &str) -> Result<Option<PipelineRecord>>;
    async fn list(&self) -> Result<Vec<PipelineRecord>>;
    async fn update(&self, id: &str, name: String, blocks: Value) -> Result<PipelineRecord>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Coerce a client-supplied blocks payload into an object.
///
/// The canvas sometimes sends the layout pre-stringified; accept a JSON
/// string, an object, or anything else wrapped so it stays representable.
pub fn normalize_blocks(blocks: Value) -> Value {
    match blocks {
        Value::Null => Value::Object(Default::default()),
        Value::Object(obj) => Value::Object(obj),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(obj)) => Value::Object(obj),
            Ok(parsed) => serde_json::json!({ "value": parsed }),
            Err(_) => serde_json::json!({ "raw": s }),
        },
        Value::Array(list) => serde_json::json!({ "list": list }),
        other => serde_json::json!({ "value": other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_accepts_object() {
        let blocks = json!({"nodes": []});
        assert_eq!(normalize_blocks(blocks.clone()), blocks);
    }

    #[test]
    fn normalize_parses_stringified_object() {
        let blocks = Value::String(r#"{"nodes":[{"id":"q"}]}"#.to_string());
        assert_eq!(normalize_blocks(blocks), json!({"nodes": [{"id": "q"}]}));
    }

    #[test]
    fn normalize_wraps_non_object_payloads() {
        assert_eq!(normalize_blocks(json!([1, 2])), json!({"list": [1, 2]}));
        assert_eq!(
            normalize_blocks(Value::String("not json".into())),
            json!({"raw": "not json"})
        );
        assert_eq!(normalize_blocks(Value::Null), json!({}));
    }
}
