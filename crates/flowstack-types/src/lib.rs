pub mod codec;
pub mod events;
pub mod flow;

pub use codec::{encode_event, NdjsonDecoder};
pub use events::StreamEvent;
pub use flow::{
    ExecuteRequest, FlowEdge, FlowNode, GenerationConfig, KnowledgeBaseConfig, NodeConfig,
    QueryConfig, Role,
};
