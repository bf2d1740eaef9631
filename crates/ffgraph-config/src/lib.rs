//! Pipeline descriptions for the ffgraph filtergraph compiler.
//!
//! This crate reads TOML pipeline files that declare media inputs, named
//! operation nodes, roots, output mappings and output flags, validates them,
//! and builds a [`FilterGraph`](ffgraph_core::FilterGraph) plus a configured
//! [`Compiler`](ffgraph_core::Compiler).
//!
//! # Features
//!
//! - **Pipeline files**: Load and save [`PipelineConfig`] as TOML
//! - **Filter registry**: Operation kinds by name with typed parameter parsing
//! - **Paths**: Platform-specific pipeline directories
//!
//! # Example
//!
//! ```rust
//! use ffgraph_config::{InputConfig, MapConfig, NodeConfig, PipelineConfig};
//!
//! let config = PipelineConfig::new("out.mp4")
//!     .with_input(InputConfig::new("main", "vid.mp4"))
//!     .with_input(InputConfig::new("music", "music.mp3"))
//!     .with_node(
//!         NodeConfig::new("rotated", "rotate")
//!             .with_inputs(["main"])
//!             .with_param("angle", "PI"),
//!     )
//!     .with_map(MapConfig::new("rotated"))
//!     .with_map(MapConfig::with_stream("music", "a"))
//!     .with_output_option("-shortest");
//!
//! let command = config.compile().unwrap();
//! assert_eq!(
//!     command.to_string(),
//!     "-i vid.mp4 -i music.mp3 -filter_complex '[0:0]rotate=PI[v2]' -map '[v2]' -map 1:a -shortest out.mp4"
//! );
//! ```

mod error;
mod pipeline;

/// Registry of operation kinds usable in pipeline files.
pub mod filters;

/// Platform-specific paths for pipeline files.
pub mod paths;

pub use error::ConfigError;
pub use filters::{
    FilterCategory, FilterDescriptor, FilterRegistry, MERGE, Operation, ParamSpec, Params,
};
pub use paths::{find_pipeline, user_config_dir, user_pipelines_dir};
pub use pipeline::{InputConfig, MapConfig, NodeConfig, Pipeline, PipelineConfig};
