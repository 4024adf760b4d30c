//! Keyframe controller chunk encodings.
//!
//! Two on-disk layouts deserialize into the same in-memory
//! [`KeyframeTrack`]:
//!
//! - `0x0827` (legacy): interleaved `{ time, rot_log, pos }` records with
//!   raw tick times and centimetre positions, normalized at load.
//! - `0x0831` (parallel): the time array followed by the key payload
//!   array, already normalized. Searching touches only the leading time
//!   array, which is why newer exporters write this layout.

use crate::error::{AnimError, Result};
use crate::track::{KeyframeTrack, PqLogKey};
use cry_data::io_ext::{ReadExt, WriteExt};
use cry_data::Vec3f;
use std::io::{Cursor, Write};

/// Chunk version of the legacy interleaved encoding
pub const CONTROLLER_VERSION_LEGACY: u16 = 0x0827;

/// Chunk version of the parallel-array encoding
pub const CONTROLLER_VERSION_PARALLEL: u16 = 0x0831;

/// Raw ticks per normalized key tick in the legacy encoding
pub const TICKS_PER_FRAME: i32 = 160;

/// Legacy positions are stored in centimetres
const POSITION_SCALE: f32 = 100.0;

/// Parse a controller chunk payload into a track, dispatching on version
pub fn parse(version: u16, data: &[u8]) -> Result<KeyframeTrack> {
    match version {
        CONTROLLER_VERSION_LEGACY => parse_legacy(data),
        CONTROLLER_VERSION_PARALLEL => parse_parallel(data),
        other => Err(AnimError::UnsupportedVersion(other)),
    }
}

fn parse_legacy(data: &[u8]) -> Result<KeyframeTrack> {
    let mut reader = Cursor::new(data);
    let controller_id = reader.read_u32_le()?;
    let num_keys = reader.read_u32_le()? as usize;

    let mut times = Vec::with_capacity(num_keys);
    let mut keys = Vec::with_capacity(num_keys);

    let mut start_time = 0i32;
    let mut last_time = i64::MIN;
    for i in 0..num_keys {
        let raw_time = reader.read_i32_le()?;
        let rot_log = Vec3f::parse(&mut reader)?;
        let pos = Vec3f::parse(&mut reader)?;

        if i == 0 {
            start_time = raw_time;
        }
        if i64::from(raw_time) <= last_time {
            log::warn!(
                "controller 0x{controller_id:08x}: repeated or unsorted time keys at index {i}"
            );
            return Err(AnimError::UnsortedKeys { controller_id });
        }
        last_time = i64::from(raw_time);

        // normalize: zero-based, raw ticks to key ticks, centimetres to
        // metres
        times.push((raw_time - start_time) / TICKS_PER_FRAME);
        keys.push(PqLogKey {
            rot_log: rot_log.to_glam(),
            pos: pos.to_glam() / POSITION_SCALE,
        });
    }

    KeyframeTrack::new(controller_id, times, keys)
}

fn parse_parallel(data: &[u8]) -> Result<KeyframeTrack> {
    let mut reader = Cursor::new(data);
    let controller_id = reader.read_u32_le()?;
    let num_keys = reader.read_u32_le()? as usize;

    let mut times = Vec::with_capacity(num_keys);
    for _ in 0..num_keys {
        times.push(reader.read_i32_le()?);
    }

    let mut keys = Vec::with_capacity(num_keys);
    for _ in 0..num_keys {
        let rot_log = Vec3f::parse(&mut reader)?;
        let pos = Vec3f::parse(&mut reader)?;
        keys.push(PqLogKey {
            rot_log: rot_log.to_glam(),
            pos: pos.to_glam(),
        });
    }

    KeyframeTrack::new(controller_id, times, keys)
}

/// Serialize a track to the legacy interleaved payload
pub fn write_legacy(track: &KeyframeTrack) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_header(&mut out, track)?;
    for (time, key) in track.times().iter().zip(track.keys()) {
        out.write_i32_le(time * TICKS_PER_FRAME)?;
        Vec3f::from_glam(key.rot_log).write(&mut out)?;
        Vec3f::from_glam(key.pos * POSITION_SCALE).write(&mut out)?;
    }
    Ok(out)
}

/// Serialize a track to the parallel-array payload
pub fn write_parallel(track: &KeyframeTrack) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_header(&mut out, track)?;
    for time in track.times() {
        out.write_i32_le(*time)?;
    }
    for key in track.keys() {
        Vec3f::from_glam(key.rot_log).write(&mut out)?;
        Vec3f::from_glam(key.pos).write(&mut out)?;
    }
    Ok(out)
}

fn write_header<W: Write>(writer: &mut W, track: &KeyframeTrack) -> Result<()> {
    writer.write_u32_le(track.controller_id())?;
    writer.write_u32_le(track.len() as u32)?;
    Ok(())
}
