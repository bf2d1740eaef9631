//! Compilation entry point and final command assembly.

use std::fmt;

use crate::error::GraphError;
use crate::format::shell_quote;
use crate::graph::{
    Dependents, Edge, FilterGraph, NodeId, NodeKind, StreamSpec, assign_input_indices, emit,
    insert_splits, insert_stream_selectors,
};

/// An explicit `-map` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMap {
    /// A stream of an input file: `-map N:stream`.
    Stream {
        /// The Source node.
        source: NodeId,
        /// Which of its streams.
        stream: StreamSpec,
    },
    /// The output of an operation: `-map [label]`.
    Operation(Edge),
}

impl OutputMap {
    /// Maps `node`: stream `0` of a source, or the output of an operation.
    ///
    /// Returns [`GraphError::InvalidMapping`] for selectors and splits.
    pub fn new(graph: &FilterGraph, node: NodeId) -> Result<Self, GraphError> {
        match graph.node(node)?.kind {
            NodeKind::Source(_) => Ok(Self::Stream {
                source: node,
                stream: StreamSpec::default(),
            }),
            NodeKind::Filter { .. } | NodeKind::Merge => Ok(Self::Operation(Edge::new(node))),
            NodeKind::Selector { .. } | NodeKind::Split { .. } => {
                Err(GraphError::InvalidMapping(node))
            }
        }
    }

    /// Maps one stream of a source.
    ///
    /// Returns [`GraphError::InvalidMapping`] if `source` is not a Source.
    pub fn with_stream(
        graph: &FilterGraph,
        source: NodeId,
        stream: StreamSpec,
    ) -> Result<Self, GraphError> {
        match graph.node(source)?.kind {
            NodeKind::Source(_) => Ok(Self::Stream { source, stream }),
            _ => Err(GraphError::InvalidMapping(source)),
        }
    }

    /// Whether this mapping reads the output of operation `node`.
    pub(crate) fn reads(&self, node: NodeId) -> bool {
        matches!(self, Self::Operation(edge) if edge.from == node)
    }

    fn args(&self, graph: &FilterGraph) -> Result<[String; 2], GraphError> {
        let target = match self {
            Self::Stream { source, stream } => {
                let index = graph
                    .source(*source)
                    .and_then(|s| s.index())
                    .ok_or(GraphError::UnresolvedSource(*source))?;
                format!("{index}:{stream}")
            }
            Self::Operation(edge) => match graph.kind(edge.from) {
                Some(NodeKind::Split { .. }) => format!("[{}]", edge.from.port_label(edge.port)),
                Some(_) => format!("[{}]", edge.from.label()),
                None => return Err(GraphError::NodeNotFound(edge.from)),
            },
        };
        Ok(["-map".to_string(), target])
    }
}

/// Compiles filter graphs into commands for one destination.
///
/// # Example
///
/// ```rust
/// use ffgraph_core::{Compiler, Filter, FilterGraph, OutputMap, Source, StreamSpec};
///
/// let mut graph = FilterGraph::new();
/// let video = graph.add_source(Source::new("vid.mp4"));
/// let music = graph.add_source(Source::new("music.mp3"));
/// let rotated = graph.add_filter(Filter::rotate("PI"), &[video]).unwrap();
///
/// let compiler = Compiler::new("out.mp4")
///     .with_map(OutputMap::new(&graph, rotated).unwrap())
///     .with_map(OutputMap::with_stream(&graph, music, StreamSpec::Audio).unwrap())
///     .with_output_option("-shortest");
/// let command = compiler.compile(&mut graph, &[rotated]).unwrap();
///
/// assert_eq!(
///     command.args(),
///     &[
///         "-i", "vid.mp4", "-i", "music.mp3",
///         "-filter_complex", "[0:0]rotate=PI[v2]",
///         "-map", "[v2]", "-map", "1:a",
///         "-shortest", "out.mp4",
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Compiler {
    destination: String,
    maps: Vec<OutputMap>,
    output_options: Vec<String>,
}

impl Compiler {
    /// Creates a compiler writing to `destination`.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            maps: Vec::new(),
            output_options: Vec::new(),
        }
    }

    /// Adds an output mapping.
    pub fn with_map(mut self, map: OutputMap) -> Self {
        self.maps.push(map);
        self
    }

    /// Adds several output mappings.
    pub fn with_maps(mut self, maps: impl IntoIterator<Item = OutputMap>) -> Self {
        self.maps.extend(maps);
        self
    }

    /// Adds one raw output flag, placed before the destination.
    pub fn with_output_option(mut self, option: impl Into<String>) -> Self {
        self.output_options.push(option.into());
        self
    }

    /// Adds several raw output flags.
    pub fn with_output_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Destination file name.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Compiles the graph reachable from `roots` into a command.
    ///
    /// Rewrites `graph` in place (selectors and splits are spliced in) and
    /// assigns source indices. Roots are deduplicated; a root that another
    /// root reads is treated as an interior node. A graph is meant to be
    /// compiled once: compiling again with operation mappings splits the
    /// mapped nodes a second time.
    ///
    /// Any error aborts the whole compilation; no partial command is returned.
    pub fn compile(&self, graph: &mut FilterGraph, roots: &[NodeId]) -> Result<Command, GraphError> {
        if roots.is_empty() {
            return Err(GraphError::NoRoots);
        }
        let mut unique: Vec<NodeId> = Vec::with_capacity(roots.len());
        for &root in roots {
            graph.node(root)?;
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        for map in &self.maps {
            let (node, valid) = match map {
                OutputMap::Stream { source, .. } => (
                    *source,
                    matches!(graph.node(*source)?.kind, NodeKind::Source(_)),
                ),
                OutputMap::Operation(edge) => (
                    edge.from,
                    matches!(
                        graph.node(edge.from)?.kind,
                        NodeKind::Filter { .. } | NodeKind::Merge
                    ),
                ),
            };
            if !valid {
                return Err(GraphError::InvalidMapping(node));
            }
        }

        let deps = Dependents::build(graph, &unique)?;
        let mut roots: Vec<NodeId> = unique.into_iter().filter(|&r| !deps.contains(r)).collect();

        insert_stream_selectors(graph, &roots)?;
        let mut maps = self.maps.clone();
        insert_splits(graph, &mut roots, &mut maps)?;

        let deps = Dependents::build(graph, &roots)?;
        let sources = assign_input_indices(graph, &roots, &deps, &maps)?;
        let schedule = emit(graph, &roots, &deps, &maps)?;

        let mut args = Vec::new();
        for &id in &sources {
            if let Some(source) = graph.source(id) {
                args.extend(source.flags());
            }
        }
        if !schedule.is_empty() {
            args.push("-filter_complex".to_string());
            args.push(schedule.to_string());
        }
        for map in &maps {
            args.extend(map.args(graph)?);
        }
        args.extend(self.output_options.iter().cloned());
        args.push(self.destination.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sources = sources.len(),
            statements = schedule.statement_count(),
            tokens = args.len(),
            "compile: command assembled"
        );
        Ok(Command(args))
    }
}

/// Compiles a single root with the given mappings into `destination`.
pub fn compile_single(
    graph: &mut FilterGraph,
    root: NodeId,
    destination: impl Into<String>,
    maps: &[OutputMap],
) -> Result<Command, GraphError> {
    Compiler::new(destination)
        .with_maps(maps.iter().cloned())
        .compile(graph, &[root])
}

/// The compiled argument list, without the program name.
///
/// `Display` renders the arguments shell-quoted and space-separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Vec<String>);

impl Command {
    /// The argument tokens.
    pub fn args(&self) -> &[String] {
        &self.0
    }

    /// Consumes the command, returning its tokens.
    pub fn into_args(self) -> Vec<String> {
        self.0
    }

    /// The `-filter_complex` expression, if the command has one.
    pub fn filter_complex(&self) -> Option<&str> {
        self.0
            .iter()
            .position(|arg| arg == "-filter_complex")
            .and_then(|i| self.0.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&shell_quote(arg))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::filter::Filter;
    use crate::graph::Source;

    #[test]
    fn test_scale_single_source() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("vid.mp4"));
        let scaled = graph.add_filter(Filter::scale(100, 100, true), &[src]).unwrap();

        let command = compile_single(&mut graph, scaled, "out.mp4", &[]).unwrap();
        assert_eq!(
            command.args(),
            &["-i", "vid.mp4", "-filter_complex", "[0:0]scale=100:100,setsar=1:1", "out.mp4"]
        );
    }

    #[test]
    fn test_source_flags_precede_filtergraph() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(
            Source::new("vid.mp4")
                .with_duration(Duration::from_secs(5))
                .looped(),
        );
        let rotated = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();

        let command = Compiler::new("out.mp4")
            .with_output_options(["-c:v", "libx264"])
            .compile(&mut graph, &[rotated])
            .unwrap();
        assert_eq!(
            command.into_args(),
            vec![
                "-stream_loop", "-1", "-t", "00:00:05", "-i", "vid.mp4",
                "-filter_complex", "[0:0]rotate=PI",
                "-c:v", "libx264", "out.mp4",
            ]
        );
    }

    #[test]
    fn test_no_roots() {
        let mut graph = FilterGraph::new();
        assert_eq!(
            Compiler::new("out.mp4").compile(&mut graph, &[]),
            Err(GraphError::NoRoots)
        );
    }

    #[test]
    fn test_invalid_mappings() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let sel = graph.select_stream(src, StreamSpec::Audio).unwrap();
        let rotated = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();

        assert_eq!(OutputMap::new(&graph, sel), Err(GraphError::InvalidMapping(sel)));
        assert_eq!(
            OutputMap::with_stream(&graph, rotated, StreamSpec::Audio),
            Err(GraphError::InvalidMapping(rotated))
        );
        assert_eq!(
            OutputMap::new(&graph, NodeId(99)),
            Err(GraphError::NodeNotFound(NodeId(99)))
        );
    }

    #[test]
    fn test_root_read_by_other_root_is_interior() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let scaled = graph.add_filter(Filter::scale(1, 1, false), &[src]).unwrap();
        let rotated = graph.add_filter(Filter::rotate("PI"), &[scaled]).unwrap();

        let command = Compiler::new("out.mp4")
            .compile(&mut graph, &[scaled, rotated, rotated])
            .unwrap();
        assert_eq!(command.filter_complex(), Some("[0:0]scale=1:1,rotate=PI"));
    }

    #[test]
    fn test_source_only_graph_has_no_filtergraph() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));

        let map = OutputMap::new(&graph, src).unwrap();
        let command = compile_single(&mut graph, src, "out.mkv", &[map]);
        let command = command.unwrap();
        assert_eq!(command.filter_complex(), None);
        assert_eq!(command.args(), &["-i", "a.mp4", "-map", "0:0", "out.mkv"]);
    }

    #[test]
    fn test_cycle_aborts() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("a.mp4"));
        let a = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();
        let b = graph.add_filter(Filter::rotate("PI"), &[a]).unwrap();
        graph.set_inputs(a, &[b]).unwrap();

        assert!(matches!(
            compile_single(&mut graph, b, "out.mp4", &[]),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_display_quotes() {
        let mut graph = FilterGraph::new();
        let src = graph.add_source(Source::new("my clip.mp4"));
        let rotated = graph.add_filter(Filter::rotate("PI"), &[src]).unwrap();

        let command = compile_single(&mut graph, rotated, "out.mp4", &[]).unwrap();
        assert_eq!(
            command.to_string(),
            "-i 'my clip.mp4' -filter_complex '[0:0]rotate=PI' out.mp4"
        );
    }
}
