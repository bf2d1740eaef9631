//! Error types for graph construction and compilation.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors that can occur while building or compiling a filter graph.
///
/// Every error aborts the whole compilation; no partial command is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The specified node was not found in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A node is reachable from itself through its inputs.
    #[error("cycle detected through node {0}")]
    CycleDetected(NodeId),

    /// An output mapping was built from a node that is neither a source nor an
    /// operation, or names an operation that is not part of the compiled graph.
    #[error("node {0} cannot be used as an output mapping")]
    InvalidMapping(NodeId),

    /// An operation received the wrong number of inputs.
    #[error("operation '{operation}' expects {expected} input(s), found {found}")]
    InvalidArity {
        /// Operation name (e.g. `"overlay"`).
        operation: &'static str,
        /// Required input count.
        expected: usize,
        /// Supplied input count.
        found: usize,
    },

    /// A node was wired to an input of the wrong role.
    #[error("invalid input for node {node}: {reason}")]
    InvalidInput {
        /// The node whose input is invalid.
        node: NodeId,
        /// Description of the violation.
        reason: String,
    },

    /// A temporal gate was attached to an operation that does not accept one.
    #[error("node {0} does not support timeline editing")]
    TimelineUnsupported(NodeId),

    /// Compilation was requested without any root node.
    #[error("no root nodes given")]
    NoRoots,

    /// A source was referenced before it received an input index.
    #[error("source {0} has no assigned input index")]
    UnresolvedSource(NodeId),
}
