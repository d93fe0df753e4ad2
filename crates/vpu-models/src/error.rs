//! Error types for predictor container operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for predictor operations.
pub type Result<T> = std::result::Result<T, VpuModelError>;

/// Errors that can occur while parsing or running a predictor container.
#[derive(Debug, Error)]
pub enum VpuModelError {
    /// Container file not found at the expected path.
    #[error("Predictor file not found: {path}")]
    FileNotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// I/O error while reading the container.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The file does not start with the container magic.
    #[error("Invalid container magic")]
    InvalidMagic,

    /// Structural parse failure.
    #[error("Parse error: {reason}")]
    ParseError {
        /// What went wrong.
        reason: String,
    },

    /// A descriptor did not match the network's input width.
    #[error("Descriptor width mismatch: got {got}, network expects {expected}")]
    DescriptorWidthMismatch {
        /// Width of the descriptor handed in.
        got: usize,
        /// Width the network was trained against.
        expected: usize,
    },
}

impl VpuModelError {
    /// Create a file-not-found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a structural parse error.
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }
}
