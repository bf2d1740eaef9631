//! Filtergraph model and compiler passes.
//!
//! A compilation runs over a [`FilterGraph`] in four passes:
//!
//! 1. **Selector insertion**: every source feeding an operation is read
//!    through a single stream selector (`[N:stream]`).
//! 2. **Split insertion**: every node with two or more uses (consumers plus
//!    output mappings) gets a `split` node with one port per use.
//! 3. **Input indexing**: each distinct source gets its `-i` position.
//! 4. **Scheduling**: a breadth-first walk from the roots emits statements,
//!    collapsing single-consumer runs into comma-joined chains.
//!
//! # Label Naming
//!
//! Labels derive from node handles: a single-output node writes `[v{id}]`, a
//! split writes `[v{id}_{port}]` for each port. Handles are allocated by the
//! graph itself, so two graphs never share counter state and repeated
//! compilations of equal graphs produce identical text.
//!
//! # Ordering
//!
//! The target syntax forbids forward references: every label must be defined
//! by an earlier statement than the one reading it. The scheduler delays a
//! node until all of its consumers have been discovered and prepends each
//! statement, so producers always precede consumers. The relative order of
//! independent sibling statements is deterministic but otherwise unspecified.

mod dependents;
mod edge;
mod filter_graph;
mod indexer;
mod node;
mod rewrite;
mod schedule;

pub use dependents::Dependents;
pub use edge::Edge;
pub use filter_graph::FilterGraph;
pub use node::{NodeId, NodeKind, Source, StreamSpec};
pub use schedule::{Schedule, Statement};

pub(crate) use indexer::assign_input_indices;
pub(crate) use rewrite::{insert_splits, insert_stream_selectors};
pub(crate) use schedule::emit;
