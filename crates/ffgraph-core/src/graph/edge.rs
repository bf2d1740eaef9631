//! Input references between graph nodes.
//!
//! An `Edge` is one slot in a consumer's input list: it names the producing
//! node and which of its output ports the consumer reads. Only split nodes
//! have more than one port; every other producer is read through port 0.

use super::node::NodeId;

/// A reference from a consumer's input slot to a producer's output port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Producing node.
    pub from: NodeId,
    /// Output port of the producer.
    pub port: usize,
}

impl Edge {
    /// Reads the single output of `from`.
    pub fn new(from: NodeId) -> Self {
        Self { from, port: 0 }
    }

    /// Reads output port `port` of `from`.
    pub(crate) fn port(from: NodeId, port: usize) -> Self {
        Self { from, port }
    }
}
