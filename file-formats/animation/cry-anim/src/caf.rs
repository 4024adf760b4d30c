//! Character animation files: a chunked container holding one keyframe
//! controller chunk per animated joint plus an optional motion-parameters
//! chunk.

use crate::chunks::controller;
use crate::chunks::motion_params::{AssetFlags, MotionParams, MOTION_PARAMETERS_VERSION};
use crate::chunks::{CHUNK_TYPE_CONTROLLER, CHUNK_TYPE_MOTION_PARAMETERS};
use crate::error::Result;
use crate::track::KeyframeTrack;
use cry_data::{ChunkFile, ChunkWriter};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Which controller layout to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerEncoding {
    /// Interleaved records with raw ticks and centimetre positions
    Legacy,
    /// Time array followed by key array, pre-normalized
    #[default]
    Parallel,
}

/// A parsed animation file: per-joint keyframe tracks, sorted by
/// controller id for binary-search lookup.
#[derive(Debug, Clone, Default)]
pub struct CafFile {
    pub params: Option<MotionParams>,
    controllers: Vec<KeyframeTrack>,
}

impl CafFile {
    /// Build a file model from tracks (sorts them by controller id)
    pub fn new(params: Option<MotionParams>, mut controllers: Vec<KeyframeTrack>) -> Self {
        controllers.sort_by_key(KeyframeTrack::controller_id);
        Self {
            params,
            controllers,
        }
    }

    /// Parse an animation file from a reader
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file = ChunkFile::parse(reader)?;

        let mut params = None;
        let mut controllers = Vec::new();
        for desc in file.chunks() {
            match desc.chunk_type {
                CHUNK_TYPE_CONTROLLER => {
                    let data = file.read_chunk(reader, desc)?;
                    controllers.push(controller::parse(desc.version, &data)?);
                }
                CHUNK_TYPE_MOTION_PARAMETERS => {
                    let data = file.read_chunk(reader, desc)?;
                    params = Some(MotionParams::parse(&data)?);
                }
                other => {
                    // unknown chunk types are carried by the container but
                    // not consumed here
                    log::debug!("skipping chunk type 0x{other:04x}");
                }
            }
        }

        log::debug!("loaded {} controllers", controllers.len());
        Ok(Self::new(params, controllers))
    }

    /// Load an animation file from a path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::parse(&mut reader)
    }

    /// Write the file with the given controller encoding
    pub fn write<W: Write + Seek>(&self, writer: W, encoding: ControllerEncoding) -> Result<W> {
        let mut chunk_writer = ChunkWriter::new(writer)?;

        if let Some(params) = &self.params {
            chunk_writer.write_chunk(
                CHUNK_TYPE_MOTION_PARAMETERS,
                MOTION_PARAMETERS_VERSION,
                0,
                &params.write()?,
            )?;
        }

        for track in &self.controllers {
            let (version, payload) = match encoding {
                ControllerEncoding::Legacy => (
                    controller::CONTROLLER_VERSION_LEGACY,
                    controller::write_legacy(track)?,
                ),
                ControllerEncoding::Parallel => (
                    controller::CONTROLLER_VERSION_PARALLEL,
                    controller::write_parallel(track)?,
                ),
            };
            chunk_writer.write_chunk(CHUNK_TYPE_CONTROLLER, version, track.controller_id(), &payload)?;
        }

        Ok(chunk_writer.finish()?)
    }

    /// Save to a path
    pub fn save<P: AsRef<Path>>(&self, path: P, encoding: ControllerEncoding) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        let mut writer = self.write(writer, encoding)?;
        writer.flush()?;
        Ok(())
    }

    /// Asset flags, empty when no motion-parameters chunk was present
    pub fn flags(&self) -> AssetFlags {
        self.params.map(|p| p.flags).unwrap_or_default()
    }

    pub fn controllers(&self) -> &[KeyframeTrack] {
        &self.controllers
    }

    pub fn controllers_mut(&mut self) -> &mut [KeyframeTrack] {
        &mut self.controllers
    }

    /// Find a controller by id (the array is kept sorted)
    pub fn controller_by_id(&self, controller_id: u32) -> Option<&KeyframeTrack> {
        self.controllers
            .binary_search_by_key(&controller_id, KeyframeTrack::controller_id)
            .ok()
            .map(|i| &self.controllers[i])
    }

    /// Find a controller by id for decoding (decode needs `&mut` for its
    /// memo cache)
    pub fn controller_by_id_mut(&mut self, controller_id: u32) -> Option<&mut KeyframeTrack> {
        self.controllers
            .binary_search_by_key(&controller_id, KeyframeTrack::controller_id)
            .ok()
            .map(move |i| &mut self.controllers[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pqlog::quat_log;
    use crate::track::PqLogKey;
    use glam::{Quat, Vec3};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn track(id: u32) -> KeyframeTrack {
        KeyframeTrack::new(
            id,
            vec![0, 8],
            vec![
                PqLogKey {
                    rot_log: quat_log(Quat::IDENTITY),
                    pos: Vec3::ZERO,
                },
                PqLogKey {
                    rot_log: quat_log(Quat::from_rotation_x(0.5)),
                    pos: Vec3::new(0.5, 0.0, 0.0),
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_controllers_sorted_and_found() {
        let caf = CafFile::new(None, vec![track(30), track(10), track(20)]);
        let ids: Vec<u32> = caf.controllers().iter().map(KeyframeTrack::controller_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);

        assert!(caf.controller_by_id(20).is_some());
        assert!(caf.controller_by_id(15).is_none());
    }

    #[test]
    fn test_file_roundtrip_parallel() {
        let caf = CafFile::new(
            Some(MotionParams {
                flags: AssetFlags::LOADED,
                compression: 1,
                ticks_per_frame: 160,
                secs_per_tick: 1.0 / 4800.0,
                start: 0,
                end: 8,
                move_speed: 1.5,
            }),
            vec![track(2), track(1)],
        );

        let cursor = caf
            .write(Cursor::new(Vec::new()), ControllerEncoding::Parallel)
            .unwrap();
        let mut cursor = Cursor::new(cursor.into_inner());
        let reloaded = CafFile::parse(&mut cursor).unwrap();

        assert_eq!(reloaded.params, caf.params);
        assert_eq!(reloaded.controllers().len(), 2);
        assert_eq!(reloaded.controllers()[0].times(), caf.controllers()[0].times());
        assert_eq!(reloaded.controllers()[1].keys(), caf.controllers()[1].keys());
    }

    #[test]
    fn test_decode_after_reload_matches() {
        let caf = CafFile::new(None, vec![track(7)]);
        for encoding in [ControllerEncoding::Legacy, ControllerEncoding::Parallel] {
            let cursor = caf.write(Cursor::new(Vec::new()), encoding).unwrap();
            let mut cursor = Cursor::new(cursor.into_inner());
            let mut reloaded = CafFile::parse(&mut cursor).unwrap();

            let mut original = caf.clone();
            for t in [0.0f32, 3.0, 8.0] {
                let a = original.controller_by_id_mut(7).unwrap().decode_key(t);
                let b = reloaded.controller_by_id_mut(7).unwrap().decode_key(t);
                assert_eq!(a.q.to_array(), b.q.to_array());
                assert_eq!(a.t.to_array(), b.t.to_array());
            }
        }
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.caf");

        let caf = CafFile::new(None, vec![track(42)]);
        caf.save(&path, ControllerEncoding::Parallel).unwrap();

        let reloaded = CafFile::load(&path).unwrap();
        assert_eq!(reloaded.controllers().len(), 1);
        assert_eq!(reloaded.controllers()[0].controller_id(), 42);
    }
}
