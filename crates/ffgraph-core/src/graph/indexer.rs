//! Input index assignment.

use crate::command::OutputMap;
use crate::error::GraphError;

use super::dependents::Dependents;
use super::filter_graph::FilterGraph;
use super::node::{NodeId, NodeKind};

/// Assigns every source referenced by the compiled graph or by an output
/// mapping its `-i` position, and returns the sources in index order.
///
/// Order: sources in first-discovery order of `deps`, then sources passed
/// directly as roots, then sources only named by mappings. The result depends
/// only on the graph shape, so re-running it assigns identical indices.
pub(crate) fn assign_input_indices(
    graph: &mut FilterGraph,
    roots: &[NodeId],
    deps: &Dependents,
    maps: &[OutputMap],
) -> Result<Vec<NodeId>, GraphError> {
    let mapped = maps.iter().filter_map(|map| match map {
        OutputMap::Stream { source, .. } => Some(*source),
        OutputMap::Operation(_) => None,
    });
    let candidates: Vec<NodeId> = deps
        .keys()
        .iter()
        .chain(roots.iter())
        .copied()
        .chain(mapped)
        .collect();

    let mut ordered: Vec<NodeId> = Vec::new();
    for id in candidates {
        if !matches!(graph.node(id)?.kind, NodeKind::Source(_)) || ordered.contains(&id) {
            continue;
        }
        let index = ordered.len();
        if let Some(source) = graph.source_mut(id) {
            source.index = Some(index);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(%id, index, "indexer: input assigned");
        ordered.push(id);
    }

    Ok(ordered)
}
