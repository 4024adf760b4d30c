//! Per-joint keyframe tracks and the time-to-pose decoder.

use crate::error::{AnimError, Result};
use crate::pqlog::{adjust_log_rotations, blend_weighted, quat_exp, WeightedKey};
use cry_data::QuatT;
use glam::Vec3;

/// One keyframe payload: rotation log + position, parallel to the track's
/// time array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PqLogKey {
    pub rot_log: Vec3,
    pub pos: Vec3,
}

/// Memo of the last query, for the per-frame pattern of decoding every
/// joint at the same clock value.
#[derive(Debug, Clone, Copy)]
struct KeyCache {
    time: f32,
    pose: QuatT,
}

/// An ordered keyframe sequence for one animated joint.
///
/// Times and key payloads live in two parallel arrays so the search loop
/// touches only the time array until the bracketing interval is found.
///
/// `decode_key` takes `&mut self` for its memo cache; a track is meant to
/// be driven by a single evaluation thread. Clone the track to sample the
/// same data from several threads.
#[derive(Debug, Clone)]
pub struct KeyframeTrack {
    controller_id: u32,
    times: Vec<i32>,
    keys: Vec<PqLogKey>,
    cache: Option<KeyCache>,
}

impl KeyframeTrack {
    /// Build a track from parallel time/key arrays.
    ///
    /// Times must be non-decreasing; duplicate adjacent times are legal
    /// (the decoder skips interpolation across them).
    pub fn new(controller_id: u32, times: Vec<i32>, keys: Vec<PqLogKey>) -> Result<Self> {
        if times.len() != keys.len() {
            return Err(AnimError::ValidationError(format!(
                "controller 0x{controller_id:08x}: {} times but {} keys",
                times.len(),
                keys.len()
            )));
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(AnimError::UnsortedKeys { controller_id });
        }
        Ok(Self {
            controller_id,
            times,
            keys,
            cache: None,
        })
    }

    pub fn controller_id(&self) -> u32 {
        self.controller_id
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[i32] {
        &self.times
    }

    pub fn keys(&self) -> &[PqLogKey] {
        &self.keys
    }

    /// First key time, in normalized ticks
    pub fn start_time(&self) -> Option<i32> {
        self.times.first().copied()
    }

    /// Last key time, in normalized ticks
    pub fn end_time(&self) -> Option<i32> {
        self.times.last().copied()
    }

    /// Decode the pose at `time` (normalized ticks, fractional allowed).
    ///
    /// Clamps outside the recorded range: the first/last key pose is held
    /// constant, never extrapolated. Decoding an empty track is a caller
    /// bug; debug builds assert, release builds return the identity pose.
    pub fn decode_key(&mut self, time: f32) -> QuatT {
        debug_assert!(!self.times.is_empty(), "decode_key on an empty track");
        if self.times.is_empty() {
            return QuatT::IDENTITY;
        }
        if let Some(cache) = self.cache {
            if cache.time == time {
                return cache.pose;
            }
        }
        let pose = self.sample(time);
        self.cache = Some(KeyCache { time, pose });
        pose
    }

    /// Decode one stored key without interpolation
    fn key_pose(&self, index: usize) -> QuatT {
        let key = &self.keys[index];
        QuatT::new(quat_exp(key.rot_log), key.pos)
    }

    /// Pure sampling; `decode_key` is this plus the memo cache.
    fn sample(&self, time: f32) -> QuatT {
        let count = self.times.len();
        let first = self.times[0] as f32;
        let last = self.times[count - 1] as f32;

        if time <= first {
            return self.key_pose(0);
        }
        if time >= last {
            return self.key_pose(count - 1);
        }

        // first < time < last, so count >= 2 and an interior interval
        // exists. Coarse search from the midpoint with halved strides;
        // the net displacement is bounded by count/2 - 1, so pos stays in
        // [1, count - 1].
        let mut pos = count >> 1;
        let mut step = count >> 2;
        while step > 0 {
            if time < self.times[pos] as f32 {
                pos -= step;
            } else if time > self.times[pos] as f32 {
                pos += step;
            } else {
                break;
            }
            step >>= 1;
        }

        // Fine-tune: key times are not evenly spaced, so the coarse pass
        // may stop adjacent to the bracketing interval. The clamp above
        // guarantees both loops stop inside [1, count - 1].
        while time > self.times[pos] as f32 {
            pos += 1;
        }
        while time < self.times[pos - 1] as f32 {
            pos -= 1;
        }

        let t0 = self.times[pos - 1] as f32;
        let t1 = self.times[pos] as f32;
        if t0 == t1 {
            // duplicate timestamps: no interval to interpolate over
            return self.key_pose(pos);
        }

        let t = (time - t0) / (t1 - t0);
        let ka = &self.keys[pos - 1];
        let kb = &self.keys[pos];
        let (la, lb) = adjust_log_rotations(ka.rot_log, kb.rot_log);
        let (log, p) = blend_weighted(&[
            WeightedKey {
                weight: 1.0 - t,
                rot_log: la,
                pos: ka.pos,
            },
            WeightedKey {
                weight: t,
                rot_log: lb,
                pos: kb.pos,
            },
        ]);
        QuatT::new(quat_exp(log), p)
    }
}
