//! Filter graph arena: node construction and in-place rewiring.
//!
//! [`FilterGraph`] owns every node; consumers refer to their inputs through
//! [`Edge`] handles, so a node shared by several consumers is never aliased
//! mutably. The rewriter splices synthetic nodes in by replacing handles in
//! consumers' input lists.

use crate::error::GraphError;
use crate::filter::{Filter, Timeline};

use super::edge::Edge;
use super::node::{NodeData, NodeId, NodeKind, Source, StreamSpec};

/// Directed acyclic graph of media operations.
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add sources: [`add_source()`](Self::add_source),
///    [`select_stream()`](Self::select_stream)
/// 3. Add operations: [`add_filter()`](Self::add_filter),
///    [`add_merge()`](Self::add_merge)
/// 4. Compile with a [`Compiler`](crate::Compiler)
///
/// Nodes can only reference nodes that already exist, so a graph built
/// through the constructors is acyclic. [`set_inputs()`](Self::set_inputs) can
/// rewire freely; cycles introduced that way are rejected at compile time.
#[derive(Debug, Default, Clone)]
pub struct FilterGraph {
    nodes: Vec<NodeData>,
}

impl FilterGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Node construction ---

    /// Adds a media source. Returns the new node's ID.
    pub fn add_source(&mut self, source: Source) -> NodeId {
        self.add_node(NodeKind::Source(source), Vec::new())
    }

    /// Adds a source and selects its audio stream. Returns the selector.
    pub fn add_audio_source(&mut self, source: Source) -> NodeId {
        let source = self.add_source(source);
        self.add_node(
            NodeKind::Selector {
                stream: StreamSpec::Audio,
            },
            vec![Edge::new(source)],
        )
    }

    /// Adds a stream selector over an existing source.
    ///
    /// Returns an error if `source` does not exist or is not a Source node.
    pub fn select_stream(&mut self, source: NodeId, stream: StreamSpec) -> Result<NodeId, GraphError> {
        if !matches!(self.node(source)?.kind, NodeKind::Source(_)) {
            return Err(GraphError::InvalidInput {
                node: source,
                reason: "stream selectors can only wrap a source".to_string(),
            });
        }
        Ok(self.add_node(NodeKind::Selector { stream }, vec![Edge::new(source)]))
    }

    /// Adds an operation consuming `inputs` in order.
    ///
    /// Returns an error if an input does not exist or the input count does not
    /// match the filter's arity.
    pub fn add_filter(&mut self, filter: Filter, inputs: &[NodeId]) -> Result<NodeId, GraphError> {
        check_arity(filter.name(), filter.arity(), inputs.len())?;
        let edges = self.edges(inputs)?;
        let id = self.add_node(
            NodeKind::Filter {
                filter,
                timeline: None,
            },
            edges,
        );
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: filter node {id}");
        Ok(id)
    }

    /// Adds an operation with a temporal gate.
    pub fn add_filter_with_timeline(
        &mut self,
        filter: Filter,
        timeline: Timeline,
        inputs: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let id = self.add_filter(filter, inputs)?;
        self.set_timeline(id, timeline)?;
        Ok(id)
    }

    /// Adds an audio merge (fan-in) node over two or more inputs.
    pub fn add_merge(&mut self, inputs: &[NodeId]) -> Result<NodeId, GraphError> {
        if inputs.len() < 2 {
            return Err(GraphError::InvalidArity {
                operation: "amerge",
                expected: 2,
                found: inputs.len(),
            });
        }
        let edges = self.edges(inputs)?;
        let id = self.add_node(NodeKind::Merge, edges);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: merge node {id}");
        Ok(id)
    }

    // --- Node mutation ---

    /// Attaches a temporal gate to a filter node.
    ///
    /// Returns [`GraphError::TimelineUnsupported`] for nodes whose filter does
    /// not accept timeline editing.
    pub fn set_timeline(&mut self, id: NodeId, timeline: Timeline) -> Result<(), GraphError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Filter {
                filter,
                timeline: slot,
            } if filter.supports_timeline() => {
                *slot = Some(timeline);
                Ok(())
            }
            _ => Err(GraphError::TimelineUnsupported(id)),
        }
    }

    /// Replaces the inputs of an operation node.
    ///
    /// The new input count must match the node's arity. The graph is not
    /// checked for cycles here; [`Compiler::compile`](crate::Compiler::compile)
    /// rejects them.
    pub fn set_inputs(&mut self, id: NodeId, inputs: &[NodeId]) -> Result<(), GraphError> {
        let edges = self.edges(inputs)?;
        let node = self.node_mut(id)?;
        match &node.kind {
            NodeKind::Filter { filter, .. } => {
                check_arity(filter.name(), filter.arity(), inputs.len())?;
            }
            NodeKind::Merge => {
                if inputs.len() < 2 {
                    return Err(GraphError::InvalidArity {
                        operation: "amerge",
                        expected: 2,
                        found: inputs.len(),
                    });
                }
            }
            NodeKind::Source(_) | NodeKind::Selector { .. } | NodeKind::Split { .. } => {
                return Err(GraphError::InvalidInput {
                    node: id,
                    reason: format!("cannot rewire a {} node", node.kind.name()),
                });
            }
        }
        node.inputs = edges;
        Ok(())
    }

    // --- Queries ---

    /// Number of nodes, including synthetic ones added by compilation.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all node IDs in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// Returns the role of a node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0 as usize).map(|n| &n.kind)
    }

    /// Returns the ordered inputs of a node.
    pub fn inputs(&self, id: NodeId) -> Option<&[Edge]> {
        self.nodes.get(id.0 as usize).map(|n| n.inputs.as_slice())
    }

    /// Returns the source data of a Source node.
    pub fn source(&self, id: NodeId) -> Option<&Source> {
        match self.kind(id)? {
            NodeKind::Source(source) => Some(source),
            _ => None,
        }
    }

    // --- Internal helpers ---

    pub(crate) fn add_node(&mut self, kind: NodeKind, inputs: Vec<Edge>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind, inputs));
        id
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, GraphError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn source_mut(&mut self, id: NodeId) -> Option<&mut Source> {
        match &mut self.nodes.get_mut(id.0 as usize)?.kind {
            NodeKind::Source(source) => Some(source),
            _ => None,
        }
    }

    /// Points the first slot of `consumer` that still reads `old` at `new`.
    ///
    /// Returns `false` if no such slot exists. Calling this once per recorded
    /// dependency rewires a consumer that reads `old` in several slots one
    /// slot at a time, in slot order.
    pub(crate) fn replace_input(
        &mut self,
        consumer: NodeId,
        old: NodeId,
        new: Edge,
    ) -> Result<bool, GraphError> {
        let node = self.node_mut(consumer)?;
        match node.inputs.iter_mut().find(|edge| edge.from == old) {
            Some(slot) => {
                *slot = new;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn edges(&self, inputs: &[NodeId]) -> Result<Vec<Edge>, GraphError> {
        inputs
            .iter()
            .map(|&id| self.node(id).map(|_| Edge::new(id)))
            .collect()
    }
}

fn check_arity(operation: &'static str, expected: usize, found: usize) -> Result<(), GraphError> {
    if expected == found {
        Ok(())
    } else {
        Err(GraphError::InvalidArity {
            operation,
            expected,
            found,
        })
    }
}
