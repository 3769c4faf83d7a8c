use std::sync::Arc;

use flowstack_graph::Engine;
use flowstack_kb::KnowledgeStore;
use flowstack_persist::PipelineStore;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// All resources are wrapped in Arc for efficient sharing across async
/// tasks. The engine is stateless and created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PipelineStore>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn PipelineStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        engine: Engine,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            knowledge,
            engine: Arc::new(engine),
        }
    }
}
