//! Reverse-edge index derived from a set of roots.

use crate::error::GraphError;

use super::filter_graph::FilterGraph;
use super::node::NodeId;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    OnStack,
    Done,
}

/// Maps every node reachable from a root set to the nodes that read it.
///
/// Built by one depth-first walk over input edges. A consumer that reads the
/// same node in several slots (`overlay(x, x)`) is recorded once per slot, so
/// [`count()`](Self::count) is the number of input slots reading the node.
/// Keys are kept in first-discovery order; roots only appear as keys when
/// another reachable node reads them.
///
/// The index is a snapshot: nodes added to the graph afterwards are unknown
/// to it and report no consumers.
#[derive(Debug, Clone, Default)]
pub struct Dependents {
    consumers: Vec<Vec<NodeId>>,
    keys: Vec<NodeId>,
}

impl Dependents {
    /// Walks `graph` from `roots` and records every reverse edge.
    ///
    /// Returns [`GraphError::CycleDetected`] if a node is reachable from
    /// itself, or [`GraphError::NodeNotFound`] for a dangling handle.
    pub fn build(graph: &FilterGraph, roots: &[NodeId]) -> Result<Self, GraphError> {
        let n = graph.node_count();
        let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut keys = Vec::new();
        let mut marks = vec![Mark::Unseen; n];
        // (node, next input slot to descend into)
        let mut stack: Vec<(NodeId, usize)> = Vec::new();

        for &root in roots {
            graph.node(root)?;
            if marks[root.0 as usize] != Mark::Unseen {
                continue;
            }
            marks[root.0 as usize] = Mark::OnStack;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, slot) = *frame;
                let inputs = &graph.node(node)?.inputs;
                let Some(edge) = inputs.get(slot) else {
                    marks[node.0 as usize] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let input = edge.from;
                let idx = input.0 as usize;
                if idx >= n {
                    return Err(GraphError::NodeNotFound(input));
                }
                if consumers[idx].is_empty() {
                    keys.push(input);
                }
                consumers[idx].push(node);

                match marks[idx] {
                    Mark::OnStack => return Err(GraphError::CycleDetected(input)),
                    Mark::Done => {}
                    Mark::Unseen => {
                        marks[idx] = Mark::OnStack;
                        stack.push((input, 0));
                    }
                }
            }
        }

        Ok(Self { consumers, keys })
    }

    /// Consumers of `id`, one entry per input slot, in discovery order.
    pub fn consumers(&self, id: NodeId) -> &[NodeId] {
        self.consumers
            .get(id.0 as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of input slots reading `id`.
    pub fn count(&self, id: NodeId) -> usize {
        self.consumers(id).len()
    }

    /// Nodes with at least one consumer, in first-discovery order.
    pub fn keys(&self) -> &[NodeId] {
        &self.keys
    }

    /// Whether `id` is read by any reachable node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.count(id) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::graph::{NodeKind, Source};

    #[test]
    fn test_linear_chain() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let b = graph.add_filter(Filter::format("yuv420p"), &[a]).unwrap();

        let deps = Dependents::build(&graph, &[b]).unwrap();
        assert_eq!(deps.keys(), &[a, src]);
        assert_eq!(deps.consumers(src), &[a]);
        assert_eq!(deps.consumers(a), &[b]);
        assert!(!deps.contains(b));
    }

    #[test]
    fn test_shared_input_recorded_per_slot() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let scaled = graph.add_filter(Filter::scale(1, 1, false), &[src]).unwrap();
        let ov = graph
            .add_filter(Filter::overlay_center(), &[scaled, scaled])
            .unwrap();

        let deps = Dependents::build(&graph, &[ov]).unwrap();
        assert_eq!(deps.consumers(scaled), &[ov, ov]);
        assert_eq!(deps.count(src), 1);
    }

    #[test]
    fn test_diamond_visits_once() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let left = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let right = graph.add_filter(Filter::curves("vintage"), &[src]).unwrap();
        let ov = graph
            .add_filter(Filter::overlay_center(), &[left, right])
            .unwrap();

        let deps = Dependents::build(&graph, &[ov]).unwrap();
        assert_eq!(deps.keys(), &[left, src, right]);
        assert_eq!(deps.consumers(src), &[left, right]);
    }

    #[test]
    fn test_multiple_roots_share_nodes() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let b = graph.add_filter(Filter::volume(2.0), &[src]).unwrap();

        let deps = Dependents::build(&graph, &[a, b, a]).unwrap();
        assert_eq!(deps.keys(), &[src]);
        assert_eq!(deps.consumers(src), &[a, b]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let b = graph.add_filter(Filter::rotate("PI"), &[a]).unwrap();
        graph.set_inputs(a, &[b]).unwrap();

        assert!(matches!(
            Dependents::build(&graph, &[b]),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_self_loop_detected() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        graph.set_inputs(a, &[a]).unwrap();

        assert_eq!(
            Dependents::build(&graph, &[a]).unwrap_err(),
            GraphError::CycleDetected(a)
        );
    }

    #[test]
    fn test_unknown_root() {
        let graph = FilterGraph::new();
        assert_eq!(
            Dependents::build(&graph, &[NodeId(3)]).unwrap_err(),
            GraphError::NodeNotFound(NodeId(3))
        );
    }

    #[test]
    fn test_nodes_added_later_are_unknown() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let deps = Dependents::build(&graph, &[src]).unwrap();
        let late = graph.add_node(NodeKind::Merge, Vec::new());
        assert_eq!(deps.count(late), 0);
    }
}
