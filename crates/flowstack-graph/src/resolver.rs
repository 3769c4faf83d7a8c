use std::collections::HashSet;

use flowstack_types::{FlowNode, Role};

use crate::error::StructuralError;
use crate::model::FlowGraph;

/// Ordered node sequence from the input node to the output node.
///
/// Computed once per execution request and discarded with it.
#[derive(Debug)]
pub struct ExecutionPath<'g> {
    nodes: Vec<&'g FlowNode>,
}

impl<'g> ExecutionPath<'g> {
    pub fn nodes(&self) -> &[&'g FlowNode] {
        &self.nodes
    }

    /// First node on the path carrying the given role.
    pub fn find_role(&self, role: Role) -> Option<&'g FlowNode> {
        self.nodes.iter().copied().find(|node| node.role == role)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Human-readable path summary for status events.
    pub fn describe(&self) -> String {
        self.nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Walk from the input node to the output node, one outgoing edge at a time.
///
/// Pipelines are linear chains in this engine; a node with more than one
/// outgoing edge on the active path fails fast instead of guessing a branch.
pub fn resolve(graph: &FlowGraph) -> Result<ExecutionPath<'_>, StructuralError> {
    let input = single_endpoint(
        graph,
        Role::is_input,
        StructuralError::MissingInput,
        StructuralError::AmbiguousInput,
    )?;
    let output = single_endpoint(
        graph,
        Role::is_output,
        StructuralError::MissingOutput,
        StructuralError::AmbiguousOutput,
    )?;

    let mut nodes = vec![input];
    let mut visited: HashSet<&str> = HashSet::from([input.id.as_str()]);
    let mut current = input;

    while current.id != output.id {
        if nodes.len() > graph.node_count() {
            return Err(StructuralError::CycleDetected);
        }

        let outgoing = graph.outgoing(&current.id);
        let next_id = match outgoing {
            [] => return Err(StructuralError::OutputUnreachable),
            [next] => next,
            _ => return Err(StructuralError::Branching(current.id.clone())),
        };
        if !visited.insert(next_id.as_str()) {
            return Err(StructuralError::CycleDetected);
        }

        // Endpoint existence was checked at graph construction.
        current = graph
            .node(next_id)
            .ok_or_else(|| StructuralError::UnknownNode(next_id.clone()))?;
        nodes.push(current);
    }

    Ok(ExecutionPath { nodes })
}

fn single_endpoint<'g>(
    graph: &'g FlowGraph,
    is_endpoint: fn(Role) -> bool,
    missing: StructuralError,
    ambiguous: StructuralError,
) -> Result<&'g FlowNode, StructuralError> {
    let mut matches = graph.nodes().iter().filter(|node| is_endpoint(node.role));
    let first = matches.next().ok_or(missing)?;
    if matches.next().is_some() {
        return Err(ambiguous);
    }
    Ok(first)
}
