//! Quaternion-logarithm math used by the keyframe and aim-pose samplers.
//!
//! Rotations are interpolated as 3-component quaternion logarithms: linear
//! blends in log space approximate spherical interpolation without per-key
//! slerp, provided the logs are first brought into the same hemisphere of
//! the double cover (see [`adjust_log_rotations`]).

use glam::{Quat, Vec3};

/// Squared-length threshold below which a log/vector part counts as zero
const LEN_SQ_EPSILON: f32 = 1e-12;

/// Convert a unit quaternion to its vector logarithm.
///
/// The zero vector represents the identity rotation. A vanishing vector
/// part (angle near 0, `w` near ±1) maps to zero rather than dividing by
/// `sin` of a tiny angle.
pub fn quat_log(q: Quat) -> Vec3 {
    let v = Vec3::new(q.x, q.y, q.z);
    let len_sq = v.length_squared();
    if len_sq > LEN_SQ_EPSILON {
        let len = len_sq.sqrt();
        let angle = len.atan2(q.w);
        v * (angle / len)
    } else {
        Vec3::ZERO
    }
}

/// Convert a vector logarithm back to a unit quaternion.
///
/// The result is explicitly renormalized: repeated log-space blending
/// accumulates drift that must never leak out as a non-unit quaternion.
pub fn quat_exp(v: Vec3) -> Quat {
    let len_sq = v.length_squared();
    if len_sq > LEN_SQ_EPSILON {
        let len = len_sq.sqrt();
        let (s, c) = len.sin_cos();
        let scale = s / len;
        Quat::from_xyzw(v.x * scale, v.y * scale, v.z * scale, c).normalize()
    } else {
        Quat::IDENTITY
    }
}

/// Replace a log with the antipodal representation of the same rotation,
/// so that `quat_exp(flip_log(v)) == -quat_exp(v)`.
fn flip_log(v: Vec3) -> Vec3 {
    let len = v.length();
    if len * len <= LEN_SQ_EPSILON {
        // identity has no distinct antipode direction
        return v;
    }
    v * (-(std::f32::consts::PI - len) / len)
}

/// Bring two rotation logs into the same hemisphere of the double cover.
///
/// When the logs point into opposite hemispheres, a linear blend between
/// them would travel the major arc; the smaller-magnitude log is swapped
/// for its antipodal representation so the blend takes the shorter path.
/// Logs already within a half-turn of each other are returned unchanged.
pub fn adjust_log_rotations(a: Vec3, b: Vec3) -> (Vec3, Vec3) {
    if a.dot(b) >= 0.0 {
        return (a, b);
    }
    if a.length_squared() > b.length_squared() {
        (a, flip_log(b))
    } else {
        (flip_log(a), b)
    }
}

/// One input to [`blend_weighted`]: a pre-normalized weight, a rotation
/// log, and a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedKey {
    pub weight: f32,
    pub rot_log: Vec3,
    pub pos: Vec3,
}

/// N-way weighted blend of rotation logs and positions.
///
/// The fold runs in input index order; each incoming log is aligned
/// against the running accumulated log and flipped to its antipode when it
/// falls into the opposite hemisphere. Only the incoming log is ever
/// flipped; already-accumulated contributions are final. Zero-weight
/// entries are skipped entirely. Weights are assumed to sum to 1.
///
/// The fold order is part of the contract: near-antipodal multi-way blends
/// can resolve differently under a different order, so callers must pass
/// entries in a fixed order (the aim sampler uses quad corner order).
pub fn blend_weighted(keys: &[WeightedKey]) -> (Vec3, Vec3) {
    let mut acc_log = Vec3::ZERO;
    let mut acc_pos = Vec3::ZERO;
    for key in keys {
        if key.weight == 0.0 {
            continue;
        }
        let mut log = key.rot_log;
        if acc_log.dot(log) < 0.0 {
            log = flip_log(log);
        }
        acc_log += log * key.weight;
        acc_pos += key.pos * key.weight;
    }
    (acc_log, acc_pos)
}
