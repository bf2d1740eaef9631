//! Graph rewriting passes run before scheduling.
//!
//! Both passes rebuild the [`Dependents`] index from scratch, splice new nodes
//! in by replacing handles in consumers' input lists, and never delete nodes.

use crate::command::OutputMap;
use crate::error::GraphError;

use super::dependents::Dependents;
use super::edge::Edge;
use super::filter_graph::FilterGraph;
use super::node::{NodeId, NodeKind, StreamSpec};

/// Interposes a stream selector between every source and the operations
/// reading it. Returns the number of selectors added.
///
/// One selector is created per source, shared by all of its operation
/// consumers. Existing selectors are left alone.
pub(crate) fn insert_stream_selectors(
    graph: &mut FilterGraph,
    roots: &[NodeId],
) -> Result<usize, GraphError> {
    let deps = Dependents::build(graph, roots)?;
    let mut inserted = 0;

    for &key in deps.keys() {
        if !matches!(graph.node(key)?.kind, NodeKind::Source(_)) {
            continue;
        }
        let mut readers = Vec::new();
        for &consumer in deps.consumers(key) {
            if graph.node(consumer)?.kind.is_operation() {
                readers.push(consumer);
            }
        }
        if readers.is_empty() {
            continue;
        }

        let selector = graph.add_node(
            NodeKind::Selector {
                stream: StreamSpec::default(),
            },
            vec![Edge::new(key)],
        );
        for consumer in readers {
            graph.replace_input(consumer, key, Edge::new(selector))?;
        }
        inserted += 1;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(inserted, "rewrite: stream selectors");
    Ok(inserted)
}

/// Interposes a split after every node used more than once. Returns the
/// number of splits added.
///
/// A node's uses are its consumer slots plus the output mappings naming it.
/// The split gets one port per use: consumers take ports in discovery order,
/// then mappings take the remaining ports in declaration order. Sources and
/// existing splits are never split. A root that gets split is replaced in
/// `roots` by its split so scheduling still reaches it.
///
/// Returns [`GraphError::InvalidMapping`] for a mapping whose operation is not
/// reachable from `roots`.
pub(crate) fn insert_splits(
    graph: &mut FilterGraph,
    roots: &mut [NodeId],
    maps: &mut [OutputMap],
) -> Result<usize, GraphError> {
    let deps = Dependents::build(graph, roots)?;

    for map in maps.iter() {
        if let OutputMap::Operation(edge) = map
            && !deps.contains(edge.from)
            && !roots.contains(&edge.from)
        {
            return Err(GraphError::InvalidMapping(edge.from));
        }
    }

    let candidates: Vec<NodeId> = deps
        .keys()
        .iter()
        .chain(roots.iter())
        .copied()
        .collect();
    let mut inserted = 0;

    for node in candidates {
        if matches!(
            graph.node(node)?.kind,
            NodeKind::Source(_) | NodeKind::Split { .. }
        ) {
            continue;
        }
        let mapped = maps.iter().filter(|m| m.reads(node)).count();
        let fan_out = deps.count(node) + mapped;
        if fan_out < 2 {
            continue;
        }

        let split = graph.add_node(NodeKind::Split { fan_out }, vec![Edge::new(node)]);
        let mut port = 0;
        for &consumer in deps.consumers(node) {
            if !graph.replace_input(consumer, node, Edge::port(split, port))? {
                return Err(GraphError::InvalidInput {
                    node: consumer,
                    reason: format!("no input slot left reading {node}"),
                });
            }
            port += 1;
        }
        for map in maps.iter_mut().filter(|m| m.reads(node)) {
            *map = OutputMap::Operation(Edge::port(split, port));
            port += 1;
        }
        for root in roots.iter_mut().filter(|r| **r == node) {
            *root = split;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%node, %split, fan_out, "rewrite: split inserted");
        inserted += 1;
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::graph::Source;

    fn selector_of(graph: &FilterGraph, source: NodeId) -> Vec<NodeId> {
        graph
            .node_ids()
            .filter(|&id| {
                matches!(graph.kind(id), Some(NodeKind::Selector { .. }))
                    && graph.inputs(id).unwrap()[0].from == source
            })
            .collect()
    }

    #[test]
    fn test_selector_shared_by_consumers() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let b = graph.add_filter(Filter::curves("vintage"), &[src]).unwrap();
        let ov = graph.add_filter(Filter::overlay_center(), &[a, b]).unwrap();

        assert_eq!(insert_stream_selectors(&mut graph, &[ov]).unwrap(), 1);
        let selectors = selector_of(&graph, src);
        assert_eq!(selectors.len(), 1);
        assert_eq!(graph.inputs(a).unwrap(), &[Edge::new(selectors[0])]);
        assert_eq!(graph.inputs(b).unwrap(), &[Edge::new(selectors[0])]);
    }

    #[test]
    fn test_selector_replaces_every_slot() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let ov = graph.add_filter(Filter::overlay_center(), &[src, src]).unwrap();

        insert_stream_selectors(&mut graph, &[ov]).unwrap();
        let sel = selector_of(&graph, src)[0];
        assert_eq!(graph.inputs(ov).unwrap(), &[Edge::new(sel), Edge::new(sel)]);
    }

    #[test]
    fn test_existing_selector_untouched() {
        let mut graph = FilterGraph::new();
        let music = graph.add_audio_source(Source::new("a.wav"));
        let louder = graph.add_filter(Filter::volume(2.0), &[music]).unwrap();

        assert_eq!(insert_stream_selectors(&mut graph, &[louder]).unwrap(), 0);
        assert_eq!(graph.inputs(louder).unwrap(), &[Edge::new(music)]);
    }

    #[test]
    fn test_split_per_shared_node() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let scaled = graph.add_filter(Filter::scale(1, 1, false), &[src]).unwrap();
        let a = graph.add_filter(Filter::rotate("PI"), &[scaled]).unwrap();
        let b = graph.add_filter(Filter::curves("vintage"), &[scaled]).unwrap();
        let ov = graph.add_filter(Filter::overlay_center(), &[a, b]).unwrap();

        insert_stream_selectors(&mut graph, &[ov]).unwrap();
        let mut roots = [ov];
        assert_eq!(insert_splits(&mut graph, &mut roots, &mut []).unwrap(), 1);

        let split = NodeId(graph.node_count() as u32 - 1);
        assert_eq!(graph.kind(split), Some(&NodeKind::Split { fan_out: 2 }));
        assert_eq!(graph.inputs(split).unwrap(), &[Edge::new(scaled)]);
        assert_eq!(graph.inputs(a).unwrap(), &[Edge::port(split, 0)]);
        assert_eq!(graph.inputs(b).unwrap(), &[Edge::port(split, 1)]);
        assert_eq!(roots, [ov]);
    }

    #[test]
    fn test_sources_never_split() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let b = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let ov = graph.add_filter(Filter::overlay_center(), &[a, b]).unwrap();

        // Without selectors the source has two consumers but is exempt.
        let mut roots = [ov];
        assert_eq!(insert_splits(&mut graph, &mut roots, &mut []).unwrap(), 0);
    }

    #[test]
    fn test_mapping_counts_as_use() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let scaled = graph.add_filter(Filter::scale(1, 1, false), &[src]).unwrap();
        let blurred = graph
            .add_filter(Filter::box_blur("2", "2", 1), &[scaled])
            .unwrap();
        let mut maps = [OutputMap::new(&graph, scaled).unwrap()];

        let mut roots = [blurred];
        insert_splits(&mut graph, &mut roots, &mut maps).unwrap();

        let split = NodeId(graph.node_count() as u32 - 1);
        assert_eq!(graph.kind(split), Some(&NodeKind::Split { fan_out: 2 }));
        assert_eq!(graph.inputs(blurred).unwrap(), &[Edge::port(split, 0)]);
        assert_eq!(maps[0], OutputMap::Operation(Edge::port(split, 1)));
    }

    #[test]
    fn test_mapped_root_is_replaced_by_its_split() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let scaled = graph.add_filter(Filter::scale(1, 1, false), &[src]).unwrap();
        let map = OutputMap::new(&graph, scaled).unwrap();
        let mut maps = [map.clone(), map];

        let mut roots = [scaled];
        insert_splits(&mut graph, &mut roots, &mut maps).unwrap();

        let split = roots[0];
        assert_eq!(graph.kind(split), Some(&NodeKind::Split { fan_out: 2 }));
        assert_eq!(maps[0], OutputMap::Operation(Edge::port(split, 0)));
        assert_eq!(maps[1], OutputMap::Operation(Edge::port(split, 1)));
    }

    #[test]
    fn test_unreachable_mapping_rejected() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let stray = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let mut maps = [OutputMap::new(&graph, stray).unwrap()];

        let mut roots = [a];
        assert_eq!(
            insert_splits(&mut graph, &mut roots, &mut maps),
            Err(GraphError::InvalidMapping(stray))
        );
    }
}
