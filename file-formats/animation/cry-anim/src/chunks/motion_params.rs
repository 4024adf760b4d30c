//! Motion-parameters chunk: asset flags and the timing data that maps key
//! ticks to seconds.

use crate::error::{AnimError, Result};
use bitflags::bitflags;
use cry_data::io_ext::{ReadExt, WriteExt};
use std::io::{Cursor, Write};

/// Chunk version of the motion-parameters payload
pub const MOTION_PARAMETERS_VERSION: u16 = 0x0925;

bitflags! {
    /// Asset state flags carried in the motion-parameters chunk
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct AssetFlags: u32 {
        /// Asset was exported on a big-endian platform
        const BIG_ENDIAN = 0x0001;
        /// Asset payload has been loaded
        const LOADED = 0x0002;
        /// Asset header has been created
        const CREATED = 0x0004;
        /// Keys are additive deltas on top of a base animation
        const ADDITIVE = 0x0008;
        /// Asset is an aim/look pose set
        const AIMPOSE = 0x0010;
        /// Asset file was missing at load time
        const NOT_FOUND = 0x0020;
    }
}

/// Drop unknown flag bits, warning once per offender.
///
/// Badly exported assets carry garbage in the upper bits; the loader keeps
/// only the bits it understands.
pub fn flags_sanity_filter(bits: u32) -> AssetFlags {
    let flags = AssetFlags::from_bits_truncate(bits);
    if flags.bits() != bits {
        log::warn!(
            "badly exported animation asset: flags 0x{bits:08x}, keeping 0x{:08x}",
            flags.bits()
        );
    }
    flags
}

/// Timing and flag data for one animation asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub flags: AssetFlags,
    pub compression: u32,
    pub ticks_per_frame: u32,
    pub secs_per_tick: f32,
    /// First key index of the global range
    pub start: i32,
    /// Last key index of the global range
    pub end: i32,
    pub move_speed: f32,
}

impl MotionParams {
    /// Parse a motion-parameters payload
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        let flags = flags_sanity_filter(reader.read_u32_le()?);
        let compression = reader.read_u32_le()?;
        let ticks_per_frame = reader.read_u32_le()?;
        let secs_per_tick = reader.read_f32_le()?;
        let start = reader.read_i32_le()?;
        let end = reader.read_i32_le()?;
        let move_speed = reader.read_f32_le()?;

        if ticks_per_frame == 0 || secs_per_tick <= 0.0 {
            return Err(AnimError::ParseError(format!(
                "invalid timing: {ticks_per_frame} ticks/frame, {secs_per_tick} secs/tick"
            )));
        }

        Ok(Self {
            flags,
            compression,
            ticks_per_frame,
            secs_per_tick,
            start,
            end,
            move_speed,
        })
    }

    /// Serialize to a chunk payload
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_inner(&mut out, self)?;
        Ok(out)
    }

    /// Keys per second
    pub fn sample_rate(&self) -> f32 {
        1.0 / (self.secs_per_tick * self.ticks_per_frame as f32)
    }

    /// Start of the asset in seconds; additive assets skip their base key
    pub fn start_sec(&self) -> f32 {
        let mut start = self.start;
        if self.flags.contains(AssetFlags::ADDITIVE) {
            start += 1;
        }
        start as f32 / self.sample_rate()
    }

    /// End of the asset in seconds, never before `start_sec`
    pub fn end_sec(&self) -> f32 {
        let end = self.end as f32 / self.sample_rate();
        end.max(self.start_sec())
    }

    pub fn duration_sec(&self) -> f32 {
        self.end_sec() - self.start_sec()
    }
}

fn write_inner<W: Write>(writer: &mut W, params: &MotionParams) -> Result<()> {
    writer.write_u32_le(params.flags.bits())?;
    writer.write_u32_le(params.compression)?;
    writer.write_u32_le(params.ticks_per_frame)?;
    writer.write_f32_le(params.secs_per_tick)?;
    writer.write_i32_le(params.start)?;
    writer.write_i32_le(params.end)?;
    writer.write_f32_le(params.move_speed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn thirty_fps() -> MotionParams {
        MotionParams {
            flags: AssetFlags::LOADED | AssetFlags::CREATED,
            compression: 0,
            ticks_per_frame: 160,
            secs_per_tick: 1.0 / 4800.0,
            start: 0,
            end: 60,
            move_speed: 0.0,
        }
    }

    #[test]
    fn test_roundtrip() {
        let params = thirty_fps();
        let payload = params.write().unwrap();
        let reloaded = MotionParams::parse(&payload).unwrap();
        assert_eq!(reloaded, params);
    }

    #[test]
    fn test_sample_rate_derivation() {
        let params = thirty_fps();
        assert!((params.sample_rate() - 30.0).abs() < 1e-4);
        assert!((params.duration_sec() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_additive_advances_start() {
        let mut params = thirty_fps();
        params.flags |= AssetFlags::ADDITIVE;
        assert!((params.start_sec() - 1.0 / 30.0).abs() < 1e-5);
    }

    #[test]
    fn test_end_clamped_to_start() {
        let mut params = thirty_fps();
        params.end = -10;
        assert_eq!(params.end_sec(), params.start_sec());
        assert_eq!(params.duration_sec(), 0.0);
    }

    #[test]
    fn test_flag_filter_drops_unknown_bits() {
        let flags = flags_sanity_filter(0xFFFF_0006);
        assert_eq!(flags, AssetFlags::LOADED | AssetFlags::CREATED);
    }

    #[test]
    fn test_zero_timing_rejected() {
        let mut payload = thirty_fps().write().unwrap();
        // zero out ticks_per_frame
        payload[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(MotionParams::parse(&payload).is_err());
    }
}
