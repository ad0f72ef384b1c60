use glam::{Mat4, Quat, Vec3};

/// One joint of the skeleton.
///
/// Joint order is fixed by the source hierarchy traversal and is the index
/// space referenced by vertices, bone groups, and animation frames.
#[derive(Debug, Clone)]
pub struct SkeletonJoint {
    pub name: String,
    /// Index of the parent joint, `-1` for roots.
    pub parent_index: i32,
    /// Inverse of the joint's resting model-space transform.
    pub inverse_bind_pose: Mat4,
}

/// Local transform of one joint in one sampled frame, relative to its
/// parent (or to the axis-mapped root for parentless joints).
///
/// Negative scale is not supported by the runtime.
#[derive(Debug, Clone, Copy)]
pub struct JointPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// One sampled time step: a pose per joint, in skeleton joint order.
#[derive(Debug, Clone, Default)]
pub struct AnimationFrame {
    pub joints: Vec<JointPose>,
}

/// A named clip of sampled frames.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub frames: Vec<AnimationFrame>,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: Vec::new(),
        }
    }
}
