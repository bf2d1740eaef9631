//! Graph node types for the filtergraph compiler.
//!
//! Each node in a [`FilterGraph`](super::FilterGraph) has a [`NodeId`] and a
//! [`NodeKind`] that determines its role: media source, stream selector,
//! filter operation, fan-out split, or fan-in merge. The `NodeData` struct
//! bundles the kind with the node's ordered input list.

use std::fmt;
use std::time::Duration;

use crate::filter::{Filter, Timeline};
use crate::format::format_duration;

use super::edge::Edge;

/// Unique identifier for a node in a filter graph.
///
/// Node IDs are assigned sequentially by the owning graph and never reused.
/// They double as the base of the node's output label, so labels are stable
/// for the lifetime of the graph and independent of every other graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Output label of a single-output node (without brackets).
    pub fn label(self) -> String {
        format!("v{}", self.0)
    }

    /// Output label of port `port` of a multi-output node (without brackets).
    pub fn port_label(self, port: usize) -> String {
        format!("v{}_{}", self.0, port)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Selects one stream inside a source.
///
/// Defaults to stream `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamSpec {
    /// Stream by absolute index.
    Index(u32),
    /// The best audio stream (`a`).
    Audio,
    /// The best video stream (`v`).
    Video,
}

impl Default for StreamSpec {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl StreamSpec {
    /// Parses `a`, `v` or a stream number.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "a" => Some(Self::Audio),
            "v" => Some(Self::Video),
            n => n.parse().ok().map(Self::Index),
        }
    }
}

impl fmt::Display for StreamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{n}"),
            Self::Audio => f.write_str("a"),
            Self::Video => f.write_str("v"),
        }
    }
}

/// An external media file and its trim/loop parameters.
///
/// The input index is assigned during compilation; it determines the position
/// of the source's `-i` group and the number in `[N:stream]` references.
#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    path: String,
    offset: Option<Duration>,
    duration: Option<Duration>,
    looped: bool,
    pub(crate) index: Option<usize>,
}

impl Source {
    /// Creates a source reading `path` from the start.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            offset: None,
            duration: None,
            looped: false,
            index: None,
        }
    }

    /// Starts reading at `offset` (`-ss`).
    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Limits the input to `duration` (`-t`).
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Loops the input indefinitely (`-stream_loop -1`).
    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }

    /// Path of the media file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Trim offset, if any.
    pub fn offset(&self) -> Option<Duration> {
        self.offset
    }

    /// Trim duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Whether the source loops.
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Input index assigned by the last compilation.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Command-line flags for this source, most specific first.
    pub(crate) fn flags(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(8);
        if self.looped {
            flags.extend(["-stream_loop".to_string(), "-1".to_string()]);
        }
        if let Some(duration) = self.duration {
            flags.extend(["-t".to_string(), format_duration(duration)]);
        }
        if let Some(offset) = self.offset {
            flags.extend(["-ss".to_string(), format_duration(offset)]);
        }
        flags.extend(["-i".to_string(), self.path.clone()]);
        flags
    }
}

/// The role of a node in the filter graph.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// External media input. Has no inputs and never emits a statement.
    Source(Source),
    /// Names one stream of its single input, which must be a Source.
    Selector {
        /// Which stream to select.
        stream: StreamSpec,
    },
    /// A concrete operation with an optional temporal gate.
    Filter {
        /// The operation.
        filter: Filter,
        /// Optional `enable='...'` gate.
        timeline: Option<Timeline>,
    },
    /// Fan-out: duplicates its single input into `fan_out` labelled copies.
    Split {
        /// Number of output ports.
        fan_out: usize,
    },
    /// Fan-in: merges all inputs into one audio stream.
    Merge,
}

impl NodeKind {
    /// True for the roles that emit filtergraph statements.
    pub fn is_operation(&self) -> bool {
        matches!(self, Self::Filter { .. } | Self::Split { .. } | Self::Merge)
    }

    /// Short role name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source(_) => "source",
            Self::Selector { .. } => "selector",
            Self::Filter { filter, .. } => filter.name(),
            Self::Split { .. } => "split",
            Self::Merge => "amerge",
        }
    }
}

/// Internal bookkeeping for a node in the graph.
#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    /// Ordered input references; the same node may appear in several slots
    /// and under several consumers.
    pub inputs: Vec<Edge>,
}

impl NodeData {
    pub fn new(kind: NodeKind, inputs: Vec<Edge>) -> Self {
        Self { kind, inputs }
    }
}
