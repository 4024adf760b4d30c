use crate::error::Result;
use crate::io_ext::{ReadExt, WriteExt};
use glam::{Quat, Vec3};
use std::io::{Read, Write};

/// A vector in 3D space as stored on disk (3×f32, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Vec3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3f {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Parse a vector from a reader
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let x = reader.read_f32_le()?;
        let y = reader.read_f32_le()?;
        let z = reader.read_f32_le()?;
        Ok(Self { x, y, z })
    }

    /// Write a vector to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32_le(self.x)?;
        writer.write_f32_le(self.y)?;
        writer.write_f32_le(self.z)?;
        Ok(())
    }

    /// Convert to a glam vector for math operations
    pub fn to_glam(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Create from a glam vector
    pub fn from_glam(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A quaternion as stored on disk (x, y, z, w order, 4×f32)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Quatf {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quatf {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Parse a quaternion from a reader
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let x = reader.read_f32_le()?;
        let y = reader.read_f32_le()?;
        let z = reader.read_f32_le()?;
        let w = reader.read_f32_le()?;
        Ok(Self { x, y, z, w })
    }

    /// Write a quaternion to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_f32_le(self.x)?;
        writer.write_f32_le(self.y)?;
        writer.write_f32_le(self.z)?;
        writer.write_f32_le(self.w)?;
        Ok(())
    }

    pub fn to_glam(self) -> Quat {
        Quat::from_xyzw(self.x, self.y, self.z, self.w)
    }

    pub fn from_glam(q: Quat) -> Self {
        Self {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
    }
}

impl Default for Quatf {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A rotation + translation joint transform.
///
/// This is the unit every sampler in the animation crates produces and
/// consumes: `q` rotates from the joint's space into its parent's space,
/// `t` is the joint origin in parent space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct QuatT {
    pub q: Quat,
    pub t: Vec3,
}

impl QuatT {
    pub const IDENTITY: Self = Self {
        q: Quat::IDENTITY,
        t: Vec3::ZERO,
    };

    pub fn new(q: Quat, t: Vec3) -> Self {
        Self { q, t }
    }

    /// Parse a transform from a reader (Quatf followed by Vec3f)
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let q = Quatf::parse(reader)?;
        let t = Vec3f::parse(reader)?;
        Ok(Self {
            q: q.to_glam(),
            t: t.to_glam(),
        })
    }

    /// Write a transform to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        Quatf::from_glam(self.q).write(writer)?;
        Vec3f::from_glam(self.t).write(writer)?;
        Ok(())
    }

    /// Compose two transforms: `self` is the parent, `rhs` the child.
    pub fn mul(&self, rhs: &QuatT) -> QuatT {
        QuatT {
            q: self.q * rhs.q,
            t: self.t + self.q * rhs.t,
        }
    }
}

impl Default for QuatT {
    fn default() -> Self {
        Self::IDENTITY
    }
}
