use flowstack_types::StreamEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// The graph is malformed or no execution path exists.
///
/// Always fatal to the request: surfaced as one `error` event followed by
/// `done`, before any generation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("edge references unknown node: {0}")]
    UnknownNode(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("missing input node")]
    MissingInput,

    #[error("ambiguous input node")]
    AmbiguousInput,

    #[error("missing output node")]
    MissingOutput,

    #[error("ambiguous output node")]
    AmbiguousOutput,

    #[error("multiple outgoing edges from node {0}")]
    Branching(String),

    #[error("cycle detected")]
    CycleDetected,

    #[error("output unreachable")]
    OutputUnreachable,
}

/// Any failure that ends one execution request.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Missing user query")]
    MissingQuery,

    #[error("No llm node on execution path")]
    MissingGeneration,

    #[error("invalid config on node {node_id}: {source}")]
    InvalidConfig {
        node_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    /// The event receiver was dropped mid-execution.
    #[error("client disconnected")]
    Disconnected,
}

impl From<mpsc::error::SendError<StreamEvent>> for ExecutionError {
    fn from(_: mpsc::error::SendError<StreamEvent>) -> Self {
        Self::Disconnected
    }
}
