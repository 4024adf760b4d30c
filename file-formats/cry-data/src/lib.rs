// Re-export main components
pub mod chunk;
pub mod error;
pub mod io_ext;
pub mod types;

// Re-export common types
pub use chunk::{ChunkDesc, ChunkFile, ChunkWriter};
pub use error::{DataError, Result};
pub use types::{QuatT, Quatf, Vec3f};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
