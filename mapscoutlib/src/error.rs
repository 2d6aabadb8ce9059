//! Error types for mapscoutlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during source map discovery
#[derive(Error, Debug)]
pub enum MapScoutError {
    /// Failed to read or stat a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// Directory traversal failed part way through
    #[error("failed to walk '{path}': {message}")]
    Walk { path: PathBuf, message: String },

    /// A lookup manifest exists but is not valid
    #[error("invalid source map manifest '{path}': {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A compiled file references a source map with a URL that cannot be resolved
    #[error("invalid sourceMappingURL '{url}' in '{path}': {reason}")]
    InvalidSourceMapUrl {
        path: PathBuf,
        url: String,
        reason: String,
    },

    /// Failed to parse a discovery configuration file
    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The bulk search backend reported a failure
    #[error("host search failed: {0}")]
    HostSearch(String),

    /// The worker pool for the build fan-out could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapScoutError {
    /// Whether this error concerns a single candidate file and may be skipped
    /// without invalidating the rest of a scan.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MapScoutError::FileRead { .. } | MapScoutError::InvalidSourceMapUrl { .. }
        )
    }

    pub(crate) fn walk(path: impl Into<PathBuf>, err: walkdir::Error) -> Self {
        if let Some(io) = err.io_error() {
            if io.kind() == std::io::ErrorKind::NotFound {
                if let Some(p) = err.path() {
                    return MapScoutError::PathNotFound(p.to_path_buf());
                }
            }
        }
        MapScoutError::Walk {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
