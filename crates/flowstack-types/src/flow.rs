use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Functional category of a node. The wire tag is the node `type` field as
/// the canvas sends it: `query`, `knowledge_base`, `llm`, `output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Query,
    KnowledgeBase,
    Llm,
    Output,
}

impl Role {
    /// The query node is the designated entry point of a pipeline.
    pub fn is_input(self) -> bool {
        matches!(self, Self::Query)
    }

    /// The output node is the designated exit point of a pipeline.
    pub fn is_output(self) -> bool {
        matches!(self, Self::Output)
    }
}

/// One node of a pipeline graph as received on the wire.
///
/// The `data` bag stays untyped at parse time; role-specific configuration is
/// materialized with [`FlowNode::config`] by the stage that executes the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub data: Value,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Materialize the role-specific configuration for this node.
    ///
    /// Validation is deliberately lazy: a malformed config bag only fails the
    /// execution that actually reaches the node.
    pub fn config(&self) -> Result<NodeConfig, serde_json::Error> {
        let data = match &self.data {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        let config = match self.role {
            Role::Query => NodeConfig::Query(serde_json::from_value(data)?),
            Role::KnowledgeBase => NodeConfig::KnowledgeBase(serde_json::from_value(data)?),
            Role::Llm => NodeConfig::Llm(serde_json::from_value(data)?),
            Role::Output => NodeConfig::Output,
        };
        Ok(config)
    }
}

/// Strongly typed per-role configuration, one variant per role.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Query(QueryConfig),
    KnowledgeBase(KnowledgeBaseConfig),
    Llm(GenerationConfig),
    Output,
}

/// Config bag of a query node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Query text captured on the canvas; an explicit request query wins.
    pub value: Option<String>,
}

/// Config bag of a knowledge_base node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub embed_model: Option<String>,
    pub top_k: Option<usize>,
}

/// Config bag of an llm node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Prompt template; `{query}` is substituted if present, otherwise the
    /// template acts as a system prompt prefix.
    pub prompt: Option<String>,
}

/// One directed edge of a pipeline graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

impl FlowEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Request body consumed by the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub pipeline_id: String,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    /// Query text; falls back to the query node's `value` when absent.
    #[serde(default)]
    pub query: Option<String>,
    /// When false, `status` and `context` events are omitted from the stream.
    #[serde(default = "default_stream_logs")]
    pub stream_logs: bool,
}

fn default_stream_logs() -> bool {
    true
}
