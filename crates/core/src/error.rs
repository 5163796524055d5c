//! Error types for chartcheck

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the chartcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading, rendering or running test suites.
///
/// Assertion failures are never reported through this type; they are
/// carried as diagnostics on `AssertionResult`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid path: {0}")]
    Path(#[from] crate::path::PathError),

    #[error("Failed to load chart {path}: {reason}")]
    ChartLoad { path: PathBuf, reason: String },

    #[error("template file `templates/{0}` not found in chart")]
    TemplateNotFound(String),

    #[error("chart `{0}` not found in dependencies")]
    DependencyNotFound(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("failed to parse rendered {file}: {reason}")]
    Manifest { file: String, reason: String },

    #[error("failed to parse {path}: {reason}")]
    ValuesFile { path: String, reason: String },

    #[error("{0}")]
    AssertionDefinition(String),

    #[error("snapshot cache dir {0} is not a directory")]
    SnapshotDir(PathBuf),
}
