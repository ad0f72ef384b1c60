//! Scene-description records consumed by the processing pipeline.
//!
//! The ingestion layer resolves the source file (modifiers, triangulation,
//! materials) into these plain per-triangle records; everything downstream
//! of this module is host-independent.

use crate::types::{Animation, Material, SkeletonJoint, Vertex};

/// One triangle of the source scene: three fully-resolved corner vertices
/// plus the material they draw with.
#[derive(Debug, Clone)]
pub struct SceneTriangle {
    /// Corner vertices in source face-loop order (winding preserved).
    pub corners: [Vertex; 3],
    /// Index into [`SceneDescription::materials`].
    pub material_index: usize,
}

/// Everything the processing pipeline needs from the source scene.
#[derive(Debug, Clone, Default)]
pub struct SceneDescription {
    pub triangles: Vec<SceneTriangle>,
    /// One entry per distinct source material, or a single dummy when
    /// materials are disabled.
    pub materials: Vec<Material>,
    /// Skeleton joints in source hierarchy order; empty when unskinned.
    pub joints: Vec<SkeletonJoint>,
    pub animations: Vec<Animation>,
}

impl SceneDescription {
    pub fn has_skeleton(&self) -> bool {
        !self.joints.is_empty()
    }
}
