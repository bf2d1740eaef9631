//! Platform-specific paths for pipeline files.
//!
//! - **User config**: `~/.config/ffgraph/` (Linux), `~/Library/Application Support/ffgraph/` (macOS), `%APPDATA%\ffgraph\` (Windows)
//! - **User pipelines**: the `pipelines/` subdirectory of the user config directory
//!
//! # Example
//!
//! ```rust,no_run
//! use ffgraph_config::paths;
//!
//! // Find a pipeline by name (a path, or a file stem in the user directory)
//! if let Some(path) = paths::find_pipeline("intro") {
//!     println!("Found pipeline at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "ffgraph";

/// Subdirectory name for pipelines.
const PIPELINES_SUBDIR: &str = "pipelines";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific pipelines directory.
pub fn user_pipelines_dir() -> PathBuf {
    user_config_dir().join(PIPELINES_SUBDIR)
}

/// Find a pipeline file by name.
///
/// `name` may be a path to an existing file, or a pipeline name (with or
/// without `.toml`) looked up in [`user_pipelines_dir`].
pub fn find_pipeline(name: &str) -> Option<PathBuf> {
    find_pipeline_in(name, &user_pipelines_dir())
}

/// Like [`find_pipeline`], searching `dir` instead of the user directory.
pub fn find_pipeline_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

/// List `.toml` files in `dir`, sorted by path.
pub fn list_pipelines_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    paths
}

/// Get the pipeline name (file stem) from a path.
pub fn pipeline_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}
