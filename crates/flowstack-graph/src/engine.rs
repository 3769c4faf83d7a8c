use std::sync::Arc;

use flowstack_kb::{KnowledgeStore, SearchOptions, Snippet};
use flowstack_llm::{GenerateOptions, GenerateRequest, GenerationEvent, GenerativeClient};
use flowstack_types::{ExecuteRequest, NodeConfig, Role, StreamEvent};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::composer::compose_prompt;
use crate::error::ExecutionError;
use crate::model::FlowGraph;
use crate::resolver::{resolve, ExecutionPath};

/// Defaults applied when a node's config bag leaves a knob unset.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_model: String,
    pub default_embed_model: String,
    pub default_top_k: usize,
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3".to_string(),
            default_embed_model: "mini".to_string(),
            default_top_k: 4,
            channel_capacity: 1000,
        }
    }
}

impl EngineConfig {
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_default_embed_model(mut self, embed_model: impl Into<String>) -> Self {
        self.default_embed_model = embed_model.into();
        self
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Executes pipeline requests against a generative backend and a knowledge
/// store, streaming progress as [`StreamEvent`]s.
pub struct Engine {
    generative: Arc<dyn GenerativeClient>,
    knowledge: Arc<dyn KnowledgeStore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(generative: Arc<dyn GenerativeClient>, knowledge: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            generative,
            knowledge,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn execution in background, return the event receiver.
    ///
    /// The returned stream always ends with exactly one `output` or `error`
    /// event followed by one `done` event. Dropping the receiver cancels the
    /// execution at its next event boundary.
    pub fn spawn_execute(&self, request: ExecuteRequest) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let generative = Arc::clone(&self.generative);
        let knowledge = Arc::clone(&self.knowledge);
        let config = self.config.clone();

        tokio::spawn(async move {
            match Self::execute_loop(request, tx.clone(), generative, knowledge, config).await {
                Ok(()) => {}
                Err(ExecutionError::Disconnected) => {
                    tracing::debug!("execution cancelled, receiver dropped");
                    return;
                }
                Err(e) => {
                    tracing::warn!("execution failed: {e}");
                    let _ = tx.send(StreamEvent::error(e.to_string())).await;
                }
            }
            let _ = tx.send(StreamEvent::done("Execution finished")).await;
        });

        rx
    }

    async fn execute_loop(
        request: ExecuteRequest,
        event_tx: mpsc::Sender<StreamEvent>,
        generative: Arc<dyn GenerativeClient>,
        knowledge: Arc<dyn KnowledgeStore>,
        config: EngineConfig,
    ) -> Result<(), ExecutionError> {
        let stream_logs = request.stream_logs;

        let graph = FlowGraph::new(request.nodes, request.edges)?;
        let path = resolve(&graph)?;

        let query = resolve_query(&request.query, &path)?;

        if stream_logs {
            event_tx
                .send(StreamEvent::status(format!("Path: {}", path.describe())))
                .await?;
        }

        let context = Self::retrieve_context(
            &path,
            &request.pipeline_id,
            &query,
            &event_tx,
            knowledge.as_ref(),
            &config,
            stream_logs,
        )
        .await?;

        let llm_node = path
            .find_role(Role::Llm)
            .ok_or(ExecutionError::MissingGeneration)?;
        let generation = match llm_node.config() {
            Ok(NodeConfig::Llm(generation)) => generation,
            Ok(_) => unreachable!("llm node materializes an llm config"),
            Err(source) => {
                return Err(ExecutionError::InvalidConfig {
                    node_id: llm_node.id.clone(),
                    source,
                })
            }
        };

        let model = generation
            .model
            .clone()
            .unwrap_or_else(|| config.default_model.clone());
        let prompt = compose_prompt(&query, &context, generation.prompt.as_deref());

        let mut options = GenerateOptions::new();
        if let Some(temperature) = generation.temperature {
            options = options.temperature(temperature);
        }

        tracing::info!(model = %model, prompt_len = prompt.len(), "starting generation");

        let mut stream = generative
            .generate_stream(GenerateRequest::new(model, prompt).with_options(options))
            .await
            .map_err(ExecutionError::Generation)?;

        let mut accumulated = String::new();
        while let Some(item) = stream.next().await {
            match item.map_err(ExecutionError::Generation)? {
                GenerationEvent::Status { message } => {
                    if stream_logs {
                        event_tx.send(StreamEvent::status(message)).await?;
                    }
                }
                GenerationEvent::Token { text } => {
                    accumulated.push_str(&text);
                    event_tx.send(StreamEvent::token(text)).await?;
                }
                GenerationEvent::Done => break,
            }
        }

        event_tx.send(StreamEvent::output(accumulated)).await?;
        Ok(())
    }

    /// Search the knowledge store when the path has a knowledge_base node.
    ///
    /// Retrieval failure degrades to an empty context rather than ending the
    /// run; a malformed node config is still fatal.
    async fn retrieve_context(
        path: &ExecutionPath<'_>,
        pipeline_id: &str,
        query: &str,
        event_tx: &mpsc::Sender<StreamEvent>,
        knowledge: &dyn KnowledgeStore,
        config: &EngineConfig,
        stream_logs: bool,
    ) -> Result<Vec<Snippet>, ExecutionError> {
        let Some(kb_node) = path.find_role(Role::KnowledgeBase) else {
            return Ok(Vec::new());
        };

        let kb_config = match kb_node.config() {
            Ok(NodeConfig::KnowledgeBase(kb_config)) => kb_config,
            Ok(_) => unreachable!("knowledge_base node materializes a knowledge_base config"),
            Err(source) => {
                return Err(ExecutionError::InvalidConfig {
                    node_id: kb_node.id.clone(),
                    source,
                })
            }
        };

        let options = SearchOptions {
            embed_model: kb_config
                .embed_model
                .unwrap_or_else(|| config.default_embed_model.clone()),
            top_k: kb_config.top_k.unwrap_or(config.default_top_k),
        };

        match knowledge.search(pipeline_id, query, &options).await {
            Ok(snippets) => {
                tracing::debug!(count = snippets.len(), "context retrieved");
                if stream_logs {
                    for snippet in &snippets {
                        event_tx
                            .send(StreamEvent::context(snippet.text.clone()))
                            .await?;
                    }
                }
                Ok(snippets)
            }
            Err(e) => {
                tracing::warn!("context retrieval failed: {e}");
                if stream_logs {
                    event_tx
                        .send(StreamEvent::status(
                            "Context retrieval failed, continuing without context",
                        ))
                        .await?;
                }
                Ok(Vec::new())
            }
        }
    }
}

/// An explicit request query wins over the query node's captured value.
fn resolve_query(
    request_query: &Option<String>,
    path: &ExecutionPath<'_>,
) -> Result<String, ExecutionError> {
    if let Some(query) = request_query {
        if !query.trim().is_empty() {
            return Ok(query.clone());
        }
    }

    if let Some(query_node) = path.find_role(Role::Query) {
        if let Ok(NodeConfig::Query(query_config)) = query_node.config() {
            if let Some(value) = query_config.value {
                if !value.trim().is_empty() {
                    return Ok(value);
                }
            }
        }
    }

    Err(ExecutionError::MissingQuery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowstack_types::{FlowEdge, FlowNode};
    use serde_json::json;

    fn query_path(query_node: FlowNode) -> FlowGraph {
        FlowGraph::new(
            vec![query_node, FlowNode::new("out", Role::Output)],
            vec![FlowEdge::new("q", "out")],
        )
        .unwrap()
    }

    #[test]
    fn request_query_wins_over_node_value() {
        let graph =
            query_path(FlowNode::new("q", Role::Query).with_data(json!({"value": "from node"})));
        let path = resolve(&graph).unwrap();

        let query = resolve_query(&Some("from request".into()), &path).unwrap();
        assert_eq!(query, "from request");
    }

    #[test]
    fn node_value_backs_an_absent_request_query() {
        let graph =
            query_path(FlowNode::new("q", Role::Query).with_data(json!({"value": "from node"})));
        let path = resolve(&graph).unwrap();

        assert_eq!(resolve_query(&None, &path).unwrap(), "from node");
        assert_eq!(resolve_query(&Some("  ".into()), &path).unwrap(), "from node");
    }

    #[test]
    fn no_query_anywhere_is_an_error() {
        let graph = query_path(FlowNode::new("q", Role::Query));
        let path = resolve(&graph).unwrap();

        assert!(matches!(
            resolve_query(&None, &path),
            Err(ExecutionError::MissingQuery)
        ));
    }
}
