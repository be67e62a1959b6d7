//! Error types for the converter.

use thiserror::Error;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting .bvh files.
#[derive(Debug, Error)]
pub enum Error {
    /// Rig mapping missing, malformed, or lacking a required joint entry.
    #[error("rig mapping: {0}")]
    Config(String),

    /// A .bvh file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A mapped bone or one of its channels is absent from the skeleton.
    #[error("missing channel data: {0}")]
    MissingChannel(String),

    /// Input or output file not readable/writable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
