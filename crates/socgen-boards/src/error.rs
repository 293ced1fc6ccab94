//! Error types for board operations.

use std::path::PathBuf;

use socgen_clock::ClockError;
use socgen_soc::SocError;

/// Errors that can occur while loading boards or assembling a SoC from one.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Board file not found.
    #[error("board file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Validation error in a board descriptor.
    #[error("validation error: {detail}")]
    Validation { detail: String },

    #[error("unknown board: '{0}'")]
    UnknownBoard(String),

    #[error("board has no pin '{name}' (index {index})")]
    UnknownPin { name: String, index: usize },

    #[error("pin '{name}' (index {index}) was already requested")]
    PinAlreadyRequested { name: String, index: usize },

    #[error("board '{board}' has no variant '{variant}' (available: {available})")]
    UnknownVariant {
        board: String,
        variant: String,
        available: String,
    },

    /// A build option the board cannot honor.
    #[error("board '{board}' does not support {option}")]
    UnsupportedOption { board: String, option: String },

    /// The board forwards its oscillator unchanged, so `sys` cannot be retuned.
    #[error("board '{board}' runs sys directly from a {available_hz} Hz clock; {requested_hz} Hz requested")]
    FixedClock {
        board: String,
        requested_hz: u64,
        available_hz: u64,
    },

    #[error("invalid option value: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Soc(#[from] SocError),
}

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;
