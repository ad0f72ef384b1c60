//! Assembly stage: triangle stream -> material buckets.
//!
//! Deduplicates vertices per bucket, computes the global quantization
//! scale, and lays out the flat vertex/index buffer offsets.

use tracing::{debug, info};

use crate::scene::SceneDescription;
use crate::types::{MeshBucket, ProcyonData};

/// Build the aggregate root from the source scene.
///
/// Triangles are consumed in source order; buckets are created in order of
/// material discovery. This ordering, together with exact-equality
/// deduplication, makes the output deterministic.
pub fn assemble(scene: &SceneDescription) -> ProcyonData {
    let mut data = ProcyonData::default();

    for triangle in &scene.triangles {
        let material_index = triangle.material_index as i32;
        let bucket = bucket_for_material(&mut data.meshes, material_index);
        for corner in &triangle.corners {
            let index = bucket.insert_vertex(corner.clone());
            bucket.push_index(index);
        }
    }

    data.scale = quantization_scale(&data.meshes).unwrap_or(1.0);
    data.finalize_offsets();

    data.materials = scene.materials.clone();
    data.joints = scene.joints.clone();
    data.animations = scene.animations.clone();

    info!(
        meshes = data.meshes.len(),
        vertices = data.vertex_total,
        indices = data.index_total,
        scale = data.scale,
        "Assembled mesh buckets"
    );

    data
}

/// Find the bucket for a material, creating it on first use.
fn bucket_for_material(meshes: &mut Vec<MeshBucket>, material_index: i32) -> &mut MeshBucket {
    let position = meshes
        .iter()
        .position(|m| m.material_index >= 0 && m.material_index == material_index);
    match position {
        Some(i) => &mut meshes[i],
        None => {
            debug!(material = material_index, "New mesh bucket");
            meshes.push(MeshBucket::new(material_index, -1));
            meshes.last_mut().expect("bucket just pushed")
        }
    }
}

/// Single symmetric quantization range: the largest absolute position
/// component across every unique vertex. `None` when there are no
/// vertices or every position is at the origin (the scale divides
/// positions, so it must stay nonzero).
fn quantization_scale(meshes: &[MeshBucket]) -> Option<f32> {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    let mut seen = false;

    for mesh in meshes {
        for vertex in mesh.vertices() {
            seen = true;
            for e in 0..3 {
                min[e] = min[e].min(vertex.position[e]);
                max[e] = max[e].max(vertex.position[e]);
            }
        }
    }

    if !seen {
        return None;
    }

    let low = min.iter().copied().fold(f32::MAX, f32::min);
    let high = max.iter().copied().fold(f32::MIN, f32::max);
    let scale = low.abs().max(high.abs());
    (scale > 0.0).then_some(scale)
}
