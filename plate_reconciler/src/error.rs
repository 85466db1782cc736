use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a reconciliation run.
///
/// Per-frame problems (missing upstream files, plates failing the format
/// check) are not errors: they degrade to empty frames or invalid plates.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse annotations in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid plate pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed line {line} in {}: {reason}", .path.display())]
    MalformedRawLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Unknown vehicle category: {0}")]
    UnknownCategory(String),

    #[error("No annotation frames found in {}", .0.display())]
    NoFrames(PathBuf),
}

impl ReconcileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReconcileError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ReconcileError::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
