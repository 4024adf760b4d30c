//! Aim-pose grids: directional example poses on a fixed polar grid, and
//! the resampler that blends the quad of examples around a query
//! direction into one full-skeleton absolute pose.

use crate::chunks::motion_params::{AssetFlags, MotionParams, MOTION_PARAMETERS_VERSION};
use crate::chunks::{CHUNK_TYPE_AIM_GRID, CHUNK_TYPE_MOTION_PARAMETERS};
use crate::error::{AnimError, Result};
use crate::pqlog::{blend_weighted, quat_exp, quat_log, WeightedKey};
use crate::skeleton::Skeleton;
use cry_data::io_ext::{ReadExt, WriteExt};
use cry_data::{ChunkFile, ChunkWriter, QuatT, Quatf};
use glam::{Quat, Vec2, Vec3};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

/// Grid columns; yaw spans [-π, π] in π/8 cells
pub const XGRID: usize = 17;

/// Grid rows; pitch spans [-π/2, π/2] in π/8 cells
pub const YGRID: usize = 9;

/// Chunk version of the aim-grid payload
pub const AIM_GRID_VERSION: u16 = 0x0100;

/// Angular size of one grid cell
const CELL_SIZE: f32 = std::f32::consts::PI / 8.0;

/// Fixed-point scale of serialized blend weights (0x2000 == 1.0)
const WEIGHT_FIXED_ONE: f32 = 0x2000 as f32;

/// A weight this close to 1 means the query sits on a stored example
const EXACT_HIT_EPSILON: f32 = 1e-6;

/// Upper bound on per-example joint counts accepted from disk
const MAX_JOINT_COUNT: u32 = 1024;

/// One captured example: the polar coordinate it was captured at and the
/// absolute (model-space) pose per joint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AimExample {
    pub polar: Vec2,
    pub poses: Vec<QuatT>,
}

/// Offline grid-refinement record. Round-trips through the asset pipeline
/// but is never consulted by the runtime sampler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct VirtualExample {
    /// Polar coordinate of the refined sample (stored as raw f32 bits to
    /// keep Eq; use `polar()` for math)
    polar_bits: [u32; 2],
    /// Indices of the four source examples
    pub corners: [u8; 4],
    /// Fixed-point corner weights, 0x2000 == 1.0
    pub weights: [i16; 4],
}

impl VirtualExample {
    pub fn new(polar: Vec2, corners: [u8; 4], weights: [f32; 4]) -> Self {
        Self {
            polar_bits: [polar.x.to_bits(), polar.y.to_bits()],
            corners,
            weights: weights.map(|w| (w * WEIGHT_FIXED_ONE) as i16),
        }
    }

    pub fn polar(&self) -> Vec2 {
        Vec2::new(
            f32::from_bits(self.polar_bits[0]),
            f32::from_bits(self.polar_bits[1]),
        )
    }

    /// Corner weights as floats
    pub fn weights_f32(&self) -> [f32; 4] {
        self.weights.map(|w| w as f32 / WEIGHT_FIXED_ONE)
    }
}

/// Polar coordinate of the grid cell `(x, y)`
pub fn cell_polar(x: usize, y: usize) -> Vec2 {
    Vec2::new(
        (x as f32 - (XGRID / 2) as f32) * CELL_SIZE,
        (y as f32 - (YGRID / 2) as f32) * CELL_SIZE,
    )
}

/// Project an orientation onto the (yaw, pitch) plane of the grid.
///
/// The forward axis is +Y; yaw turns about +Z, pitch tilts towards ±Z.
pub fn polar_coordinate(q: Quat) -> Vec2 {
    let fwd = q * Vec3::Y;
    let len = (fwd.x * fwd.x + fwd.y * fwd.y).sqrt();
    if len > 1e-4 {
        Vec2::new((-fwd.x).atan2(fwd.y), -fwd.z.atan2(len))
    } else {
        // looking straight up or down: yaw is undefined
        Vec2::new(0.0, -fwd.z.atan2(len))
    }
}

/// The 17×9 grid of optional examples plus the offline refinement list.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AimPoseGrid {
    joint_count: usize,
    /// Orientation of the aim-center pose, the reference all example
    /// directions are measured against
    pub mid_pose: Quat,
    /// Row-major `y * XGRID + x`
    cells: Vec<Option<AimExample>>,
    pub virtual_examples: Vec<VirtualExample>,
}

impl AimPoseGrid {
    /// Create an empty grid for skeletons with `joint_count` joints
    pub fn new(joint_count: usize) -> Self {
        Self {
            joint_count,
            mid_pose: Quat::IDENTITY,
            cells: vec![None; XGRID * YGRID],
            virtual_examples: Vec::new(),
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&AimExample> {
        if x >= XGRID || y >= YGRID {
            return None;
        }
        self.cells[y * XGRID + x].as_ref()
    }

    /// Number of set cells
    pub fn example_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Store an absolute-pose example at cell `(x, y)`
    pub fn set_cell(&mut self, x: usize, y: usize, example: AimExample) -> Result<()> {
        if x >= XGRID || y >= YGRID {
            return Err(AnimError::ValidationError(format!(
                "cell ({x}, {y}) outside the {XGRID}x{YGRID} grid"
            )));
        }
        if example.poses.len() != self.joint_count {
            return Err(AnimError::ValidationError(format!(
                "example has {} joints, grid expects {}",
                example.poses.len(),
                self.joint_count
            )));
        }
        self.cells[y * XGRID + x] = Some(example);
        Ok(())
    }

    /// Capture an example from a parent-local pose: converts it to model
    /// space through the skeleton and keys it at the cell's polar
    /// coordinate.
    pub fn set_example(
        &mut self,
        x: usize,
        y: usize,
        skeleton: &Skeleton,
        relative: &[QuatT],
    ) -> Result<()> {
        if skeleton.joint_count() != self.joint_count {
            return Err(AnimError::ValidationError(format!(
                "skeleton has {} joints, grid expects {}",
                skeleton.joint_count(),
                self.joint_count
            )));
        }
        let poses = skeleton.absolute_from_relative(relative)?;
        self.set_cell(
            x,
            y,
            AimExample {
                polar: cell_polar(x, y),
                poses,
            },
        )
    }

    pub fn clear_cell(&mut self, x: usize, y: usize) {
        if x < XGRID && y < YGRID {
            self.cells[y * XGRID + x] = None;
        }
    }

    /// Nearest set cell to `(x, y)` by Chebyshev distance; expanding ring
    /// search, each ring scanned row-major, first hit wins. Pure function
    /// of the grid contents.
    fn nearest_set_cell(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        let max_radius = XGRID.max(YGRID) as i32;
        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue; // interior of the ring, already visited
                    }
                    let cx = x as i32 + dx;
                    let cy = y as i32 + dy;
                    if cx < 0 || cy < 0 || cx >= XGRID as i32 || cy >= YGRID as i32 {
                        continue;
                    }
                    let (cx, cy) = (cx as usize, cy as usize);
                    if self.cells[cy * XGRID + cx].is_some() {
                        return Some((cx, cy));
                    }
                }
            }
        }
        None
    }

    /// Blend the quad of examples around `(yaw, pitch)` into an absolute
    /// pose.
    ///
    /// Queries outside the grid range are clamped. Unset corners are
    /// substituted by their nearest set cell; an entirely empty grid fails
    /// with [`AnimError::MissingExampleData`] and callers fall back to the
    /// skeleton's bind pose.
    pub fn sample(&self, yaw: f32, pitch: f32) -> Result<Vec<QuatT>> {
        let fx = (yaw / CELL_SIZE + (XGRID / 2) as f32).clamp(0.0, (XGRID - 1) as f32);
        let fy = (pitch / CELL_SIZE + (YGRID / 2) as f32).clamp(0.0, (YGRID - 1) as f32);

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(XGRID - 1);
        let y1 = (y0 + 1).min(YGRID - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        // corners in fixed quad order with their bilinear weights
        let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
        let weights = [
            (1.0 - tx) * (1.0 - ty),
            tx * (1.0 - ty),
            tx * ty,
            (1.0 - tx) * ty,
        ];

        // resolve contributing corners, substituting unset cells; corners
        // with zero weight never contribute and are not resolved
        let mut resolved: [Option<&AimExample>; 4] = [None; 4];
        for (slot, ((x, y), w)) in resolved.iter_mut().zip(corners.iter().zip(weights)) {
            if w == 0.0 {
                continue;
            }
            let example = match self.cell(*x, *y) {
                Some(example) => example,
                None => {
                    let (nx, ny) = self
                        .nearest_set_cell(*x, *y)
                        .ok_or(AnimError::MissingExampleData)?;
                    self.cells[ny * XGRID + nx]
                        .as_ref()
                        .ok_or(AnimError::MissingExampleData)?
                }
            };
            *slot = Some(example);
        }

        // exact hit: return the stored example verbatim, bypassing blend
        // rounding
        for (w, example) in weights.iter().zip(&resolved) {
            if *w >= 1.0 - EXACT_HIT_EPSILON {
                if let Some(example) = example {
                    return Ok(example.poses.clone());
                }
            }
        }

        let mut out = Vec::with_capacity(self.joint_count);
        for j in 0..self.joint_count {
            let mut keys = [WeightedKey {
                weight: 0.0,
                rot_log: Vec3::ZERO,
                pos: Vec3::ZERO,
            }; 4];
            for (key, (w, example)) in keys.iter_mut().zip(weights.iter().zip(&resolved)) {
                if let Some(example) = example {
                    *key = WeightedKey {
                        weight: *w,
                        rot_log: quat_log(example.poses[j].q),
                        pos: example.poses[j].t,
                    };
                }
            }
            let (log, pos) = blend_weighted(&keys);
            out.push(QuatT::new(quat_exp(log), pos));
        }
        Ok(out)
    }

    /// Parse an aim-grid chunk payload
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);

        let joint_count = reader.read_u32_le()?;
        if joint_count > MAX_JOINT_COUNT {
            return Err(AnimError::ParseError(format!(
                "aim grid claims {joint_count} joints (limit {MAX_JOINT_COUNT})"
            )));
        }
        let joint_count = joint_count as usize;
        let mid_pose = Quatf::parse(&mut reader)?.to_glam();

        let mut cells = Vec::with_capacity(XGRID * YGRID);
        for _ in 0..XGRID * YGRID {
            match reader.read_u8()? {
                0 => cells.push(None),
                1 => {
                    let px = reader.read_f32_le()?;
                    let py = reader.read_f32_le()?;
                    let mut poses = Vec::with_capacity(joint_count);
                    for _ in 0..joint_count {
                        poses.push(QuatT::parse(&mut reader)?);
                    }
                    cells.push(Some(AimExample {
                        polar: Vec2::new(px, py),
                        poses,
                    }));
                }
                other => {
                    return Err(AnimError::ParseError(format!(
                        "invalid cell marker {other}"
                    )));
                }
            }
        }

        let virtual_count = reader.read_u32_le()?;
        let mut virtual_examples = Vec::with_capacity(virtual_count.min(4096) as usize);
        for _ in 0..virtual_count {
            let px = reader.read_f32_le()?;
            let py = reader.read_f32_le()?;
            let mut corners = [0u8; 4];
            reader.read_exact(&mut corners)?;
            let mut weights = [0i16; 4];
            for w in &mut weights {
                *w = reader.read_i16_le()?;
            }
            virtual_examples.push(VirtualExample {
                polar_bits: [px.to_bits(), py.to_bits()],
                corners,
                weights,
            });
        }

        Ok(Self {
            joint_count,
            mid_pose,
            cells,
            virtual_examples,
        })
    }

    /// Serialize to an aim-grid chunk payload
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.write_u32_le(self.joint_count as u32)?;
        Quatf::from_glam(self.mid_pose).write(&mut out)?;

        for cell in &self.cells {
            match cell {
                None => out.write_u8(0)?,
                Some(example) => {
                    out.write_u8(1)?;
                    out.write_f32_le(example.polar.x)?;
                    out.write_f32_le(example.polar.y)?;
                    for pose in &example.poses {
                        pose.write(&mut out)?;
                    }
                }
            }
        }

        out.write_u32_le(self.virtual_examples.len() as u32)?;
        for ve in &self.virtual_examples {
            let polar = ve.polar();
            out.write_f32_le(polar.x)?;
            out.write_f32_le(polar.y)?;
            out.write_all(&ve.corners)?;
            for w in ve.weights {
                out.write_i16_le(w)?;
            }
        }
        Ok(out)
    }
}

/// An aim-pose asset file: the grid chunk plus optional motion parameters.
#[derive(Debug, Clone)]
pub struct AimFile {
    pub params: Option<MotionParams>,
    pub grid: AimPoseGrid,
}

impl AimFile {
    /// Parse an aim-pose file from a reader
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let file = ChunkFile::parse(reader)?;

        let mut params = None;
        let mut grid = None;
        for desc in file.chunks() {
            match desc.chunk_type {
                CHUNK_TYPE_AIM_GRID => {
                    if desc.version != AIM_GRID_VERSION {
                        return Err(AnimError::UnsupportedVersion(desc.version));
                    }
                    let data = file.read_chunk(reader, desc)?;
                    grid = Some(AimPoseGrid::parse(&data)?);
                }
                CHUNK_TYPE_MOTION_PARAMETERS => {
                    let data = file.read_chunk(reader, desc)?;
                    params = Some(MotionParams::parse(&data)?);
                }
                other => {
                    log::debug!("skipping chunk type 0x{other:04x}");
                }
            }
        }

        let grid = grid.ok_or_else(|| {
            AnimError::ParseError("aim-pose file has no aim-grid chunk".to_string())
        })?;
        Ok(Self { params, grid })
    }

    /// Load an aim-pose file from a path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::parse(&mut reader)
    }

    /// Write the file to a writer
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut chunk_writer = ChunkWriter::new(writer)?;
        if let Some(params) = &self.params {
            chunk_writer.write_chunk(
                CHUNK_TYPE_MOTION_PARAMETERS,
                MOTION_PARAMETERS_VERSION,
                0,
                &params.write()?,
            )?;
        }
        chunk_writer.write_chunk(CHUNK_TYPE_AIM_GRID, AIM_GRID_VERSION, 0, &self.grid.write()?)?;
        Ok(chunk_writer.finish()?)
    }

    /// Save to a path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        let mut writer = self.write(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Asset flags, empty when no motion-parameters chunk was present
    pub fn flags(&self) -> AssetFlags {
        self.params.map(|p| p.flags).unwrap_or_default()
    }
}
