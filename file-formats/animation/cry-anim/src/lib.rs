// Re-export main components
pub mod aim;
pub mod caf;
pub mod chunks;
pub mod error;
pub mod pqlog;
pub mod skeleton;
pub mod track;

// Re-export common types
pub use aim::{AimExample, AimFile, AimPoseGrid};
pub use caf::{CafFile, ControllerEncoding};
pub use chunks::motion_params::{AssetFlags, MotionParams};
pub use error::{AnimError, Result};
pub use skeleton::{Joint, Skeleton};
pub use track::{KeyframeTrack, PqLogKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
