//! Build orchestration errors.

use std::path::PathBuf;

use socgen_boards::{BoardError, ProgrammerError};
use thiserror::Error;

/// Errors that can occur while building, loading or flashing a SoC.
///
/// None of these are retried: each one means the request cannot succeed
/// as given.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("artifact not found: {} ({reason})", path.display())]
    ArtifactNotFound { path: PathBuf, reason: String },

    #[error("unsupported operation '{operation}': {reason}")]
    UnsupportedOperation {
        operation: &'static str,
        reason: String,
    },

    /// Passed through untouched so the tool's own diagnostic reaches the operator.
    #[error(transparent)]
    Programmer(#[from] ProgrammerError),

    #[error("output directory {} is locked by build {holder}", path.display())]
    LockContention { path: PathBuf, holder: String },

    #[error("build cancelled")]
    Cancelled,

    #[error("failed to start toolchain '{program}': {source}")]
    ToolchainSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("toolchain '{program}' failed ({status}):\n{diagnostic}")]
    Toolchain {
        program: String,
        status: String,
        diagnostic: String,
    },

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
