use std::io;
use thiserror::Error;

/// Error types for chunk-container parsing and binary plumbing
#[derive(Error, Debug)]
pub enum DataError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in the file header
    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// Unsupported container version
    #[error("Unsupported container version: 0x{0:04x}")]
    UnsupportedVersion(u32),

    /// Chunk error: malformed table entry or out-of-range payload
    #[error("Chunk error: {0}")]
    ChunkError(String),

    /// Error during parsing
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type using DataError
pub type Result<T> = std::result::Result<T, DataError>;
