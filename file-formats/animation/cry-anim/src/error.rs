use cry_data::DataError;
use std::io;
use thiserror::Error;

/// Error types for animation asset parsing and sampling
#[derive(Error, Debug)]
pub enum AnimError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error in the underlying chunk container
    #[error("Container error: {0}")]
    Data(#[from] DataError),

    /// Unsupported controller chunk version
    #[error("Unsupported controller chunk version: 0x{0:04x}")]
    UnsupportedVersion(u16),

    /// Error during parsing
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Controller contains repeated or unsorted time keys
    #[error("Controller 0x{controller_id:08x} contains repeated or unsorted time keys")]
    UnsortedKeys { controller_id: u32 },

    /// Aim grid has no usable example reachable from a query
    #[error("Aim grid has no usable example data")]
    MissingExampleData,

    /// Error during validation
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
