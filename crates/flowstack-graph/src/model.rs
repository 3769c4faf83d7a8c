use std::collections::HashMap;

use flowstack_types::{FlowEdge, FlowNode};

use crate::error::StructuralError;

/// Validated in-memory pipeline graph, owned by one execution request.
///
/// Construction checks structural integrity only: ids unique, every edge
/// endpoint present. Reachability and cycles are the resolver's concern.
#[derive(Debug)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    index: HashMap<String, usize>,
    adjacency: HashMap<String, Vec<String>>,
}

impl FlowGraph {
    pub fn new(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> Result<Self, StructuralError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), position).is_some() {
                return Err(StructuralError::DuplicateNode(node.id.clone()));
            }
        }

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &edges {
            if !index.contains_key(&edge.source) {
                return Err(StructuralError::UnknownNode(edge.source.clone()));
            }
            if !index.contains_key(&edge.target) {
                return Err(StructuralError::UnknownNode(edge.target.clone()));
            }
            adjacency
                .entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
        }

        Ok(Self { nodes, index, adjacency })
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// All nodes, in the order the request supplied them.
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    /// Targets of the node's outgoing edges, in edge insertion order.
    pub fn outgoing(&self, id: &str) -> &[String] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
