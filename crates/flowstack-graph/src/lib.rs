pub mod composer;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolver;

pub use composer::{compose_prompt, QUERY_PLACEHOLDER};
pub use engine::{Engine, EngineConfig};
pub use error::{ExecutionError, StructuralError};
pub use model::FlowGraph;
pub use resolver::{resolve, ExecutionPath};

// Re-export key types so engine consumers need a single dependency
pub use flowstack_types::{ExecuteRequest, FlowEdge, FlowNode, Role, StreamEvent};
