//! Pipeline file format and graph construction.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use ffgraph_core::{
    Command, Compiler, FilterGraph, NodeId, OutputMap, Source, StreamSpec, Timeline,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filters::{FilterRegistry, Operation};

/// A complete compile job: sources, operations, roots, mappings and output.
///
/// # TOML Format
///
/// ```toml
/// output = "out.mp4"
/// output_options = ["-shortest"]
/// roots = ["rotated"]
///
/// [[inputs]]
/// name = "main"
/// path = "vid.mp4"
/// duration = 5.0
///
/// [[inputs]]
/// name = "music"
/// path = "music.mp3"
///
/// [[nodes]]
/// name = "scaled"
/// filter = "scale"
/// inputs = ["main"]
/// [nodes.params]
/// width = 400
/// height = -2
///
/// [[nodes]]
/// name = "rotated"
/// filter = "rotate"
/// inputs = ["scaled"]
/// params = { angle = "PI" }
///
/// [[maps]]
/// from = "rotated"
///
/// [[maps]]
/// from = "music"
/// stream = "a"
/// ```
///
/// Node inputs name earlier inputs or nodes; `"<input>:<stream>"` selects one
/// stream of an input (`0`, `1`, ..., `a`, `v`). Without `roots`, the last
/// declared node is the root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Destination path, the last command token.
    pub output: String,

    /// Flags placed between the mappings and the destination.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_options: Vec<String>,

    /// Names of the nodes whose outputs end the filtergraph.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<String>,

    /// Media files.
    #[serde(default)]
    pub inputs: Vec<InputConfig>,

    /// Operations, in dependency order.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Explicit `-map` directives.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maps: Vec<MapConfig>,
}

/// One media file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    /// Name other entries refer to.
    pub name: String,
    /// Path passed to `-i`.
    pub path: String,
    /// Input duration limit in seconds (`-t`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Start offset in seconds (`-ss`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Loop the input indefinitely.
    #[serde(rename = "loop", default, skip_serializing_if = "is_false")]
    pub looped: bool,
}

/// One operation node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    /// Name other entries refer to.
    pub name: String,
    /// Operation kind, as listed by [`FilterRegistry`].
    pub filter: String,
    /// Input references, in slot order.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Active from this time (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<f64>,
    /// Active until this time (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<f64>,
    /// Raw `enable` expression; wins over `since`/`until`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<String>,
    /// Operation parameters (strings, numbers or booleans).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, toml::Value>,
}

/// One `-map` directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapConfig {
    /// Input or node name.
    pub from: String,
    /// Stream of an input (default `0`); not allowed for nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PipelineConfig {
    /// Create an empty pipeline writing to `output`.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            output_options: Vec::new(),
            roots: Vec::new(),
            inputs: Vec::new(),
            nodes: Vec::new(),
            maps: Vec::new(),
        }
    }

    /// Add an input.
    pub fn with_input(mut self, input: InputConfig) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add a node.
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a root by node name.
    pub fn with_root(mut self, name: impl Into<String>) -> Self {
        self.roots.push(name.into());
        self
    }

    /// Add a mapping.
    pub fn with_map(mut self, map: MapConfig) -> Self {
        self.maps.push(map);
        self
    }

    /// Add an output flag.
    pub fn with_output_option(mut self, option: impl Into<String>) -> Self {
        self.output_options.push(option.into());
        self
    }

    /// Load a pipeline from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(
            path = %path.display(),
            inputs = config.inputs.len(),
            nodes = config.nodes.len(),
            "pipeline loaded"
        );
        Ok(config)
    }

    /// Load a pipeline from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the pipeline to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the pipeline to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build the graph and compiler with the built-in operation kinds.
    pub fn build(&self) -> Result<Pipeline, ConfigError> {
        self.build_with(&FilterRegistry::new())
    }

    /// Build the graph and compiler, resolving kinds through `registry`.
    pub fn build_with(&self, registry: &FilterRegistry) -> Result<Pipeline, ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::EmptyPipeline);
        }
        let mut builder = Builder {
            registry,
            graph: FilterGraph::new(),
            names: BTreeMap::new(),
            selectors: HashMap::new(),
        };
        for input in &self.inputs {
            builder.add_input(input)?;
        }
        for node in &self.nodes {
            builder.add_node(node)?;
        }

        let roots = if self.roots.is_empty() {
            let last = self.nodes.last().ok_or(ConfigError::EmptyPipeline)?;
            vec![builder.node(&last.name)?]
        } else {
            self.roots
                .iter()
                .map(|name| builder.node(name))
                .collect::<Result<Vec<_>, _>>()?
        };

        let maps = self
            .maps
            .iter()
            .map(|map| builder.output_map(map))
            .collect::<Result<Vec<_>, _>>()?;
        let compiler = Compiler::new(self.output.clone())
            .with_maps(maps)
            .with_output_options(self.output_options.iter().cloned());

        tracing::debug!(
            nodes = builder.graph.node_count(),
            roots = roots.len(),
            maps = self.maps.len(),
            "pipeline built"
        );
        Ok(Pipeline {
            graph: builder.graph,
            roots,
            compiler,
            names: builder
                .names
                .into_iter()
                .map(|(name, named)| (name, named.id()))
                .collect(),
        })
    }

    /// Build and compile in one step.
    pub fn compile(&self) -> Result<Command, ConfigError> {
        self.build()?.compile()
    }
}

impl InputConfig {
    /// Create an input reading `path` from the start.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            duration: None,
            offset: None,
            looped: false,
        }
    }

    /// Limit the input to `seconds`.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    /// Start reading at `seconds`.
    pub fn with_offset(mut self, seconds: f64) -> Self {
        self.offset = Some(seconds);
        self
    }

    /// Loop the input.
    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }
}

impl NodeConfig {
    /// Create a node of kind `filter` with no inputs or parameters.
    pub fn new(name: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: filter.into(),
            inputs: Vec::new(),
            since: None,
            until: None,
            enable: None,
            params: BTreeMap::new(),
        }
    }

    /// Set the input references.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Set a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Gate the node between `since` and `until` seconds.
    pub fn between(mut self, since: f64, until: f64) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    /// Gate the node with a raw expression.
    pub fn with_enable(mut self, expr: impl Into<String>) -> Self {
        self.enable = Some(expr.into());
        self
    }

    fn timeline(&self) -> Result<Option<Timeline>, ConfigError> {
        if self.since.is_none() && self.until.is_none() && self.enable.is_none() {
            return Ok(None);
        }
        let mut timeline = Timeline::new();
        if let Some(since) = self.since {
            timeline = timeline.since(check_time(&self.name, since)?);
        }
        if let Some(until) = self.until {
            timeline = timeline.until(check_time(&self.name, until)?);
        }
        if let Some(expr) = &self.enable {
            timeline = timeline.enable(expr.clone());
        }
        Ok(Some(timeline))
    }

    fn string_params(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        self.params
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    _ => {
                        return Err(ConfigError::invalid_param(
                            self.filter.as_str(),
                            key.as_str(),
                            "expected a string, number or boolean",
                        ));
                    }
                };
                Ok((key.clone(), text))
            })
            .collect()
    }
}

impl MapConfig {
    /// Map an input's stream `0` or a node's output.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            stream: None,
        }
    }

    /// Map one stream of an input.
    pub fn with_stream(from: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            stream: Some(stream.into()),
        }
    }
}

fn check_time(name: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidTime {
            name: name.to_string(),
            value,
        })
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidTime {
        name: name.to_string(),
        value,
    })
}

/// A declared name and the graph node it resolved to.
#[derive(Debug, Clone, Copy)]
enum Named {
    Input(NodeId),
    Node(NodeId),
}

impl Named {
    fn id(self) -> NodeId {
        match self {
            Named::Input(id) | Named::Node(id) => id,
        }
    }
}

struct Builder<'a> {
    registry: &'a FilterRegistry,
    graph: FilterGraph,
    names: BTreeMap<String, Named>,
    selectors: HashMap<(NodeId, StreamSpec), NodeId>,
}

impl Builder<'_> {
    fn declare(&mut self, name: &str, named: Named) -> Result<(), ConfigError> {
        if name.is_empty() || name.contains(':') {
            return Err(ConfigError::InvalidStream(name.to_string()));
        }
        if self.names.insert(name.to_string(), named).is_some() {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn add_input(&mut self, input: &InputConfig) -> Result<(), ConfigError> {
        let mut source = Source::new(input.path.clone());
        if let Some(duration) = input.duration {
            source = source.with_duration(seconds(&input.name, duration)?);
        }
        if let Some(offset) = input.offset {
            source = source.with_offset(seconds(&input.name, offset)?);
        }
        if input.looped {
            source = source.looped();
        }
        let id = self.graph.add_source(source);
        self.declare(&input.name, Named::Input(id))
    }

    fn add_node(&mut self, node: &NodeConfig) -> Result<(), ConfigError> {
        let params = node.string_params()?;
        let operation = self.registry.create(&node.filter, &params)?;
        let inputs = node
            .inputs
            .iter()
            .map(|reference| self.resolve(reference))
            .collect::<Result<Vec<_>, _>>()?;

        let id = match operation {
            Operation::Filter(filter) => self.graph.add_filter(filter, &inputs)?,
            Operation::Merge => self.graph.add_merge(&inputs)?,
        };
        if let Some(timeline) = node.timeline()? {
            self.graph.set_timeline(id, timeline)?;
        }
        self.declare(&node.name, Named::Node(id))
    }

    /// Resolves an input reference, creating one selector per distinct
    /// `(input, stream)` pair.
    fn resolve(&mut self, reference: &str) -> Result<NodeId, ConfigError> {
        let Some((name, stream)) = reference.split_once(':') else {
            return self
                .names
                .get(reference)
                .map(|named| named.id())
                .ok_or_else(|| ConfigError::UnknownName(reference.to_string()));
        };
        let source = match self.names.get(name) {
            Some(Named::Input(id)) => *id,
            Some(Named::Node(_)) => return Err(ConfigError::InvalidStream(reference.to_string())),
            None => return Err(ConfigError::UnknownName(name.to_string())),
        };
        let stream =
            StreamSpec::parse(stream).ok_or_else(|| ConfigError::InvalidStream(reference.to_string()))?;
        if let Some(&selector) = self.selectors.get(&(source, stream)) {
            return Ok(selector);
        }
        let selector = self.graph.select_stream(source, stream)?;
        self.selectors.insert((source, stream), selector);
        Ok(selector)
    }

    fn node(&self, name: &str) -> Result<NodeId, ConfigError> {
        match self.names.get(name) {
            Some(Named::Node(id)) => Ok(*id),
            Some(Named::Input(_)) => Err(ConfigError::NotANode(name.to_string())),
            None => Err(ConfigError::UnknownName(name.to_string())),
        }
    }

    fn output_map(&self, map: &MapConfig) -> Result<OutputMap, ConfigError> {
        match (self.names.get(&map.from), &map.stream) {
            (Some(Named::Input(id)), stream) => {
                let stream = match stream {
                    Some(text) => StreamSpec::parse(text)
                        .ok_or_else(|| ConfigError::InvalidStream(format!("{}:{text}", map.from)))?,
                    None => StreamSpec::default(),
                };
                Ok(OutputMap::with_stream(&self.graph, *id, stream)?)
            }
            (Some(Named::Node(_)), Some(text)) => {
                Err(ConfigError::InvalidStream(format!("{}:{text}", map.from)))
            }
            (Some(Named::Node(id)), None) => Ok(OutputMap::new(&self.graph, *id)?),
            (None, _) => Err(ConfigError::UnknownName(map.from.clone())),
        }
    }
}

/// A built pipeline, ready to compile once.
#[derive(Debug, Clone)]
pub struct Pipeline {
    graph: FilterGraph,
    roots: Vec<NodeId>,
    compiler: Compiler,
    names: BTreeMap<String, NodeId>,
}

impl Pipeline {
    /// The constructed graph.
    pub fn graph(&self) -> &FilterGraph {
        &self.graph
    }

    /// Root nodes, in declaration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The configured compiler.
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Node an input or node name resolved to.
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Compile the graph. Consumes the pipeline since compilation rewrites
    /// the graph in place.
    pub fn compile(mut self) -> Result<Command, ConfigError> {
        let command = self.compiler.compile(&mut self.graph, &self.roots)?;
        tracing::debug!(tokens = command.args().len(), "pipeline compiled");
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffgraph_core::{GraphError, NodeKind};

    fn two_inputs() -> PipelineConfig {
        PipelineConfig::new("out.mp4")
            .with_input(InputConfig::new("main", "vid.mp4"))
            .with_input(InputConfig::new("music", "music.mp3"))
    }

    #[test]
    fn test_empty_pipeline() {
        let err = two_inputs().build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPipeline));
    }

    #[test]
    fn test_default_root_is_last_node() {
        let pipeline = two_inputs()
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .with_node(NodeConfig::new("b", "format").with_inputs(["a"]).with_param("pix_fmt", "yuv420p"))
            .build()
            .unwrap();
        assert_eq!(pipeline.roots(), &[pipeline.node("b").unwrap()]);
    }

    #[test]
    fn test_forward_reference_is_unknown() {
        let err = two_inputs()
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["b"]).with_param("angle", "PI"))
            .with_node(NodeConfig::new("b", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownName(ref n) if n == "b"));
    }

    #[test]
    fn test_duplicate_name() {
        let err = two_inputs()
            .with_node(NodeConfig::new("main", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(ref n) if n == "main"));
    }

    #[test]
    fn test_stream_references_share_a_selector() {
        let pipeline = two_inputs()
            .with_node(NodeConfig::new("quiet", "volume").with_inputs(["music:a"]).with_param("level", 0.5))
            .with_node(NodeConfig::new("slow", "atempo").with_inputs(["music:a"]).with_param("speed", 0.8))
            .with_node(NodeConfig::new("mix", "merge").with_inputs(["quiet", "slow"]))
            .build()
            .unwrap();
        let graph = pipeline.graph();
        let quiet = pipeline.node("quiet").unwrap();
        let slow = pipeline.node("slow").unwrap();
        let selector = graph.inputs(quiet).unwrap()[0].from;
        assert_eq!(graph.inputs(slow).unwrap()[0].from, selector);
        assert_eq!(
            graph.kind(selector),
            Some(&NodeKind::Selector {
                stream: StreamSpec::Audio
            })
        );
    }

    #[test]
    fn test_stream_of_a_node_is_invalid() {
        let err = two_inputs()
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .with_node(NodeConfig::new("b", "rotate").with_inputs(["a:0"]).with_param("angle", "PI"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStream(ref r) if r == "a:0"));
    }

    #[test]
    fn test_bad_stream_spec() {
        let err = two_inputs()
            .with_node(NodeConfig::new("a", "volume").with_inputs(["music:audio"]).with_param("level", 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStream(_)));
    }

    #[test]
    fn test_root_must_be_a_node() {
        let err = two_inputs()
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .with_root("main")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotANode(ref n) if n == "main"));
    }

    #[test]
    fn test_wrong_arity_is_a_graph_error() {
        let err = two_inputs()
            .with_node(NodeConfig::new("a", "overlay_center").with_inputs(["main"]))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Graph(GraphError::InvalidArity {
                operation: "overlay",
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_timeline_on_unsupported_kind() {
        let err = two_inputs()
            .with_node(
                NodeConfig::new("a", "rotate")
                    .with_inputs(["main"])
                    .with_param("angle", "PI")
                    .between(1.0, 2.0),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Graph(GraphError::TimelineUnsupported(_))));
    }

    #[test]
    fn test_negative_times_rejected() {
        let err = PipelineConfig::new("out.mp4")
            .with_input(InputConfig::new("main", "vid.mp4").with_offset(-1.0))
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTime { ref name, .. } if name == "main"));

        let err = two_inputs()
            .with_node(
                NodeConfig::new("t", "curves")
                    .with_inputs(["main"])
                    .with_param("preset", "vintage")
                    .between(-2.0, 1.0),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTime { ref name, .. } if name == "t"));
    }

    #[test]
    fn test_table_param_rejected() {
        let mut table = toml::value::Table::new();
        table.insert("x".to_string(), toml::Value::Integer(1));
        let err = two_inputs()
            .with_node(
                NodeConfig::new("a", "rotate")
                    .with_inputs(["main"])
                    .with_param("angle", toml::Value::Table(table)),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref param, .. } if param == "angle"));
    }

    #[test]
    fn test_map_stream_on_node_is_invalid() {
        let err = two_inputs()
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["main"]).with_param("angle", "PI"))
            .with_map(MapConfig::with_stream("a", "v"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStream(ref s) if s == "a:v"));
    }

    #[test]
    fn test_toml_roundtrip_keeps_loop_key() {
        let config = PipelineConfig::new("out.mp4")
            .with_input(InputConfig::new("bg", "bg.mp4").looped())
            .with_node(NodeConfig::new("a", "rotate").with_inputs(["bg"]).with_param("angle", "PI"));
        let text = config.to_toml().unwrap();
        assert!(text.contains("loop = true"), "got: {text}");
        assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }
}
