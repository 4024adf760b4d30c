//! Chunk payload encodings for the animation assets.

pub mod controller;
pub mod motion_params;

/// Chunk type id of keyframe controller chunks
pub const CHUNK_TYPE_CONTROLLER: u16 = 0x000D;

/// Chunk type id of the motion-parameters chunk
pub const CHUNK_TYPE_MOTION_PARAMETERS: u16 = 0x0010;

/// Chunk type id of the aim-pose grid chunk
pub const CHUNK_TYPE_AIM_GRID: u16 = 0x0011;
