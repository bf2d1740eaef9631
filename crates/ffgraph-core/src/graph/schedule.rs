//! Statement scheduling and emission.
//!
//! [`emit()`] walks a rewritten graph breadth-first from its roots and
//! produces a [`Schedule`]: the ordered statements of one `-filter_complex`
//! expression. Each statement is prepended, and a node is only emitted once
//! every consumer slot reading it has been reached, so every label is defined
//! before the first statement that reads it.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::command::OutputMap;
use crate::error::GraphError;

use super::dependents::Dependents;
use super::filter_graph::FilterGraph;
use super::node::{NodeData, NodeId, NodeKind};

/// One `;`-separated statement: input labels, a comma-joined chain of
/// operations, output labels.
///
/// Labels are stored without brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    inputs: Vec<String>,
    filters: Vec<String>,
    outputs: Vec<String>,
}

impl Statement {
    /// Labels read by the statement, in slot order.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Rendered operations, upstream first.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Labels defined by the statement.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.inputs {
            write!(f, "[{label}]")?;
        }
        f.write_str(&self.filters.join(","))?;
        for label in &self.outputs {
            write!(f, "[{label}]")?;
        }
        Ok(())
    }
}

/// Ordered statements of a compiled filtergraph.
///
/// `Display` joins the statements with `;`, giving the `-filter_complex`
/// argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    statements: Vec<Statement>,
}

impl Schedule {
    /// Returns the number of statements.
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Returns `true` if nothing needs filtering.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements in output order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

/// Emits the statements for a graph that has been through both rewrite passes
/// and input indexing.
///
/// `deps` must be built from `roots` on the rewritten graph. Mappings count as
/// uses when deciding chain boundaries and whether a head gets a label.
///
/// # Panics
///
/// Panics if a split port is not read exactly once by the emitted statements
/// and mappings together. The rewriter sizes every split to its uses, so this
/// only fires when that sizing and the emitter disagree.
pub(crate) fn emit(
    graph: &FilterGraph,
    roots: &[NodeId],
    deps: &Dependents,
    maps: &[OutputMap],
) -> Result<Schedule, GraphError> {
    let uses = |id: NodeId| deps.count(id) + maps.iter().filter(|m| m.reads(id)).count();

    let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
    let mut visited = vec![false; graph.node_count()];
    let mut remaining: HashMap<NodeId, usize> = HashMap::new();
    let mut port_reads: HashMap<NodeId, Vec<usize>> = HashMap::new();
    let mut splits: Vec<(NodeId, usize)> = Vec::new();
    let mut statements: VecDeque<Statement> = VecDeque::new();

    while let Some(id) = queue.pop_front() {
        let node = graph.node(id)?;
        if visited[id.0 as usize] {
            continue;
        }

        match &node.kind {
            NodeKind::Source(_) => {
                visited[id.0 as usize] = true;
            }
            NodeKind::Selector { .. } => {
                visited[id.0 as usize] = true;
                queue.extend(node.inputs.iter().map(|e| e.from));
            }
            NodeKind::Filter { .. } | NodeKind::Split { .. } | NodeKind::Merge => {
                let counter = remaining.entry(id).or_insert_with(|| deps.count(id));
                *counter = counter.saturating_sub(1);
                if *counter > 0 {
                    // A consumer slot reading this node is still queued.
                    continue;
                }
                visited[id.0 as usize] = true;

                let mut chain = vec![id];
                let mut tail = node;
                while let [edge] = tail.inputs.as_slice() {
                    let next = graph.node(edge.from)?;
                    if visited[edge.from.0 as usize] || !next.kind.is_operation() || uses(edge.from) != 1 {
                        break;
                    }
                    visited[edge.from.0 as usize] = true;
                    chain.push(edge.from);
                    tail = next;
                }

                let mut inputs = Vec::with_capacity(tail.inputs.len());
                for edge in &tail.inputs {
                    let producer = graph.node(edge.from)?;
                    let label = match &producer.kind {
                        NodeKind::Selector { stream } => {
                            let source = producer.inputs.first().map(|e| e.from).ok_or_else(|| {
                                GraphError::InvalidInput {
                                    node: edge.from,
                                    reason: "selector has no source".to_string(),
                                }
                            })?;
                            let index = graph
                                .source(source)
                                .and_then(|s| s.index())
                                .ok_or(GraphError::UnresolvedSource(source))?;
                            format!("{index}:{stream}")
                        }
                        NodeKind::Split { .. } => {
                            port_reads.entry(edge.from).or_default().push(edge.port);
                            edge.from.port_label(edge.port)
                        }
                        NodeKind::Filter { .. } | NodeKind::Merge => edge.from.label(),
                        NodeKind::Source(_) => return Err(GraphError::UnresolvedSource(edge.from)),
                    };
                    inputs.push(label);
                    queue.push_back(edge.from);
                }

                let mut filters = Vec::with_capacity(chain.len());
                for &member in chain.iter().rev() {
                    filters.extend(render(graph.node(member)?));
                }

                let outputs = match node.kind {
                    NodeKind::Split { fan_out } => {
                        splits.push((id, fan_out));
                        (0..fan_out).map(|port| id.port_label(port)).collect()
                    }
                    _ if uses(id) > 0 => vec![id.label()],
                    _ => Vec::new(),
                };

                let statement = Statement {
                    inputs,
                    filters,
                    outputs,
                };
                #[cfg(feature = "tracing")]
                tracing::debug!(%id, chained = chain.len(), "emit: {statement}");
                statements.push_front(statement);
            }
        }
    }

    for map in maps {
        if let OutputMap::Operation(edge) = map {
            if matches!(graph.node(edge.from)?.kind, NodeKind::Split { .. }) {
                port_reads.entry(edge.from).or_default().push(edge.port);
            }
        }
    }
    for (split, fan_out) in splits {
        let mut counts = vec![0usize; fan_out];
        for port in port_reads.remove(&split).unwrap_or_default() {
            assert!(port < fan_out, "split {split} has no port {port}");
            counts[port] += 1;
        }
        assert!(
            counts.iter().all(|&c| c == 1),
            "split {split} port reads {counts:?} do not match its fan-out"
        );
    }

    Ok(Schedule {
        statements: statements.into(),
    })
}

/// Filtergraph text of one operation, gate included.
fn render(node: &NodeData) -> Option<String> {
    match &node.kind {
        NodeKind::Filter { filter, timeline } => {
            let text = filter.render();
            Some(match timeline {
                Some(timeline) => timeline.apply(text),
                None => text,
            })
        }
        NodeKind::Split { fan_out: 2 } => Some("split".to_string()),
        NodeKind::Split { fan_out } => Some(format!("split={fan_out}")),
        NodeKind::Merge => Some(format!("amerge=inputs={}", node.inputs.len())),
        NodeKind::Source(_) | NodeKind::Selector { .. } => None,
    }
}
