//! ffgraph Core - filtergraph compiler for command-line media processors
//!
//! This crate turns a directed acyclic graph of typed media operations (scale,
//! overlay, blur, split, stream selection, ...) into a single argument list for
//! an external command-line media processor: source flags, one
//! `-filter_complex` expression, output mappings and the destination.
//!
//! # Core Abstractions
//!
//! ## Graph Model
//!
//! - [`FilterGraph`] - Arena of nodes addressed by [`NodeId`] handles
//! - [`NodeKind`] - Closed set of node roles (source, selector, filter, split, merge)
//! - [`Source`] / [`StreamSpec`] - External media inputs and stream discriminators
//!
//! ## Operations
//!
//! - [`Filter`] - Catalogue of concrete operations and their text templates
//! - [`Timeline`] - Temporal gating (`enable='...'`) for timeline-capable filters
//!
//! ## Compilation
//!
//! - [`Compiler`] - Rewrites the graph, assigns input indices, schedules statements
//! - [`OutputMap`] - Explicit `-map` directives
//! - [`Command`] - The final token list
//!
//! # Example
//!
//! ```rust
//! use ffgraph_core::{Compiler, Filter, FilterGraph, Source};
//!
//! let mut graph = FilterGraph::new();
//! let input = graph.add_source(Source::new("input.mp4"));
//! let scaled = graph.add_filter(Filter::scale(640, 360, true), &[input]).unwrap();
//!
//! let command = Compiler::new("out.mp4").compile(&mut graph, &[scaled]).unwrap();
//! assert_eq!(command.filter_complex(), Some("[0:0]scale=640:360,setsar=1:1"));
//! ```
//!
//! A graph is compiled once: rewriting splices stream selectors and split nodes
//! into it in place. Every piece of mutable state (node handles, labels) lives
//! in the [`FilterGraph`] itself, so independent graphs compile independently.

mod command;
mod error;
mod filter;
pub mod format;
pub mod graph;

pub use command::{Command, Compiler, OutputMap, compile_single};
pub use error::GraphError;
pub use filter::{Filter, Timeline};
pub use graph::{
    Dependents, Edge, FilterGraph, NodeId, NodeKind, Schedule, Source, Statement, StreamSpec,
};
