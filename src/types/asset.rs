use crate::types::{Animation, Material, MeshBucket, SkeletonJoint};

/// Joint-index members of one subskeleton, sorted ascending, at most
/// [`crate::process::subskeleton::MAX_GROUP_SIZE`] entries.
pub type BoneGroup = Vec<u16>;

/// Aggregate root for one export run.
///
/// Constructed empty, populated by one pass over the source scene,
/// optionally re-bucketed by the subskeleton partitioner, then consumed
/// exactly once by an encoder.
#[derive(Debug, Clone)]
pub struct ProcyonData {
    /// Symmetric quantization range for positions, computed once after all
    /// meshes are finalized.
    pub scale: f32,
    /// Total unique vertices across all buckets (at assembly time).
    pub vertex_total: u32,
    /// Total indices across all buckets (at assembly time).
    pub index_total: u32,
    pub meshes: Vec<MeshBucket>,
    pub materials: Vec<Material>,
    pub joints: Vec<SkeletonJoint>,
    pub animations: Vec<Animation>,
    pub bone_groups: Vec<BoneGroup>,
}

impl Default for ProcyonData {
    fn default() -> Self {
        Self {
            scale: 1.0,
            vertex_total: 0,
            index_total: 0,
            meshes: Vec::new(),
            materials: Vec::new(),
            joints: Vec::new(),
            animations: Vec::new(),
            bone_groups: Vec::new(),
        }
    }
}

impl ProcyonData {
    /// Sum of frame counts across all animations.
    pub fn total_frame_count(&self) -> usize {
        self.animations.iter().map(|a| a.frames.len()).sum()
    }

    /// Compute per-bucket running offsets into the flat global vertex and
    /// index buffers, plus the totals. Call once, after all buckets are
    /// finalized.
    pub fn finalize_offsets(&mut self) {
        let mut vertex_offset = 0u32;
        let mut index_offset = 0u32;
        for mesh in &mut self.meshes {
            mesh.vertex_offset = vertex_offset;
            mesh.index_offset = index_offset;
            vertex_offset += mesh.vertex_count() as u32;
            index_offset += mesh.index_count() as u32;
        }
        self.vertex_total = vertex_offset;
        self.index_total = index_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vertex;

    #[test]
    fn default_scale_is_one() {
        let data = ProcyonData::default();
        assert_eq!(data.scale, 1.0);
        assert_eq!(data.total_frame_count(), 0);
    }

    #[test]
    fn offsets_are_running_sums() {
        let mut data = ProcyonData::default();
        for n in [2usize, 3, 1] {
            let mut bucket = MeshBucket::new(0, -1);
            for i in 0..n {
                let index = bucket.insert_vertex(Vertex {
                    position: [i as f32, 0.0, 0.0],
                    ..Default::default()
                });
                bucket.push_index(index);
                bucket.push_index(index);
                bucket.push_index(index);
            }
            data.meshes.push(bucket);
        }

        data.finalize_offsets();

        assert_eq!(data.meshes[0].vertex_offset, 0);
        assert_eq!(data.meshes[1].vertex_offset, 2);
        assert_eq!(data.meshes[2].vertex_offset, 5);
        assert_eq!(data.meshes[0].index_offset, 0);
        assert_eq!(data.meshes[1].index_offset, 6);
        assert_eq!(data.meshes[2].index_offset, 15);
        assert_eq!(data.vertex_total, 6);
        assert_eq!(data.index_total, 18);
    }
}
