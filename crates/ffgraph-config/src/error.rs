//! Error types for pipeline configuration.

use std::path::PathBuf;

use ffgraph_core::GraphError;
use thiserror::Error;

/// Errors that can occur while loading, validating or building a pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Pipeline file not found
    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),

    /// Unknown operation kind
    #[error("unknown filter kind: {0}")]
    UnknownFilter(String),

    /// Reference to an input or node that has not been declared (yet)
    #[error("unknown input or node '{0}'")]
    UnknownName(String),

    /// A root names an input instead of a node
    #[error("'{0}' names an input, not a node")]
    NotANode(String),

    /// Two inputs or nodes share a name
    #[error("duplicate name '{0}'")]
    DuplicateName(String),

    /// Invalid parameter
    #[error("invalid parameter '{param}' for filter '{filter}': {reason}")]
    InvalidParameter {
        /// Filter kind the parameter belongs to.
        filter: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Invalid stream selection in a reference or mapping
    #[error("invalid stream selection '{0}'")]
    InvalidStream(String),

    /// Negative or non-finite time value
    #[error("invalid time for '{name}': {value}")]
    InvalidTime {
        /// Input or node the value belongs to.
        name: String,
        /// The rejected value in seconds.
        value: f64,
    },

    /// Nothing to compile
    #[error("pipeline declares no nodes")]
    EmptyPipeline,

    /// Graph construction or compilation failed
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_param(
        filter: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidParameter {
            filter: filter.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }
}
