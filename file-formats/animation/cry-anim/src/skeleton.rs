//! Skeleton topology consumed read-only by the samplers: parent indices
//! and the default (bind) local pose per joint.

use crate::error::{AnimError, Result};
use cry_data::QuatT;

/// One joint of a skeleton
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Joint {
    /// Parent joint index; `None` for a root joint
    pub parent: Option<usize>,
    /// Default parent-local transform (bind pose)
    pub default_rel: QuatT,
}

/// Tree of joints in topological order (every parent precedes its children).
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Skeleton {
    joints: Vec<Joint>,
}

impl Skeleton {
    /// Build a skeleton, validating that joints are topologically ordered.
    pub fn new(joints: Vec<Joint>) -> Result<Self> {
        for (i, joint) in joints.iter().enumerate() {
            if let Some(p) = joint.parent {
                if p >= i {
                    return Err(AnimError::ValidationError(format!(
                        "joint {i} has parent {p}, joints must be topologically ordered"
                    )));
                }
            }
        }
        Ok(Self { joints })
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Compose parent-local transforms into model-space transforms.
    ///
    /// `relative` must hold one transform per joint in skeleton order.
    pub fn absolute_from_relative(&self, relative: &[QuatT]) -> Result<Vec<QuatT>> {
        if relative.len() != self.joints.len() {
            return Err(AnimError::ValidationError(format!(
                "pose has {} joints, skeleton has {}",
                relative.len(),
                self.joints.len()
            )));
        }
        let mut absolute: Vec<QuatT> = Vec::with_capacity(self.joints.len());
        for (i, joint) in self.joints.iter().enumerate() {
            let abs = match joint.parent {
                Some(p) => absolute[p].mul(&relative[i]),
                None => relative[i],
            };
            absolute.push(abs);
        }
        Ok(absolute)
    }

    /// Model-space bind pose, the safe fallback when animation data is
    /// missing or corrupt.
    pub fn bind_pose_absolute(&self) -> Vec<QuatT> {
        let mut absolute: Vec<QuatT> = Vec::with_capacity(self.joints.len());
        for joint in &self.joints {
            let abs = match joint.parent {
                Some(p) => absolute[p].mul(&joint.default_rel),
                None => joint.default_rel,
            };
            absolute.push(abs);
        }
        absolute
    }
}
