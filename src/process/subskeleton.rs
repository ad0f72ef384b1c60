//! Subskeleton partitioner.
//!
//! Regroups skinned triangles into buckets keyed by (material, bone group)
//! so that one draw call never addresses more than [`MAX_GROUP_SIZE`]
//! joints. Runs only when a skeleton is present and the portable format is
//! requested.
//!
//! The packing is a greedy best-fit-by-score heuristic, not an optimal
//! partition. The exact scoring and tie-break rules are load-bearing:
//! existing assets were produced by them and the runtime expects group
//! contents to be reproducible.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{ProcyonError, Result};
use crate::types::{BoneGroup, MeshBucket, ProcyonData, Vertex};

/// Joint capacity of one bone group (the runtime's matrix palette size).
pub const MAX_GROUP_SIZE: usize = 8;

/// Compute bone groups and re-bucket every triangle by
/// (material, subskeleton).
///
/// Fails when some triangle references more than [`MAX_GROUP_SIZE`]
/// distinct joints; no smaller partition can cover it.
pub fn partition(data: &mut ProcyonData) -> Result<()> {
    let connections = collect_connection_sets(&data.meshes, data.joints.len());
    debug!(count = connections.len(), "Distinct connection sets");

    let groups = pack_bone_groups(connections)?;
    info!(groups = groups.len(), "Computed bone groups");

    data.meshes = rebucket(&data.meshes, &groups)?;
    data.bone_groups = groups;

    info!(meshes = data.meshes.len(), "Re-bucketed meshes by subskeleton");
    Ok(())
}

/// The sorted, deduplicated joint indices referenced with weight > 0 by
/// any corner of triangle `t`.
fn connection_set(mesh: &MeshBucket, t: usize) -> Vec<u16> {
    let mut set = Vec::new();
    for index in mesh.triangle(t) {
        let vertex = &mesh.vertices()[index as usize];
        for (&joint, &weight) in vertex.joint_indices.iter().zip(&vertex.joint_weights) {
            if weight > 0.0 && joint >= 0 && !set.contains(&(joint as u16)) {
                set.push(joint as u16);
            }
        }
    }
    set.sort_unstable();
    set
}

/// Gather the pool of connection sets to pack: every distinct per-triangle
/// set, plus a singleton for each joint not covered by any of them, minus
/// sets that are proper subsets of another (they are covered for free).
/// Returned in lexicographic order, which fixes the tie-break iteration
/// order of the packer.
fn collect_connection_sets(meshes: &[MeshBucket], joint_count: usize) -> Vec<Vec<u16>> {
    let mut distinct: BTreeSet<Vec<u16>> = BTreeSet::new();
    for mesh in meshes {
        for t in 0..mesh.triangle_count() {
            distinct.insert(connection_set(mesh, t));
        }
    }
    distinct.remove(&Vec::new());

    for joint in 0..joint_count as u16 {
        if !distinct.iter().any(|set| set.contains(&joint)) {
            distinct.insert(vec![joint]);
        }
    }

    let pool: Vec<Vec<u16>> = distinct.iter().cloned().collect();
    pool.iter()
        .filter(|a| {
            !pool
                .iter()
                .any(|b| a.len() < b.len() && a.iter().all(|j| b.contains(j)))
        })
        .cloned()
        .collect()
}

/// Append to `a` the elements of `b` it does not already contain,
/// preserving order.
fn join_unique(a: &[u16], b: &[u16]) -> Vec<u16> {
    let mut joined = a.to_vec();
    for &j in b {
        if !joined.contains(&j) {
            joined.push(j);
        }
    }
    joined
}

/// Greedy bin packing of connection sets into groups of at most
/// [`MAX_GROUP_SIZE`] joints.
///
/// Each round scores every (group, connection) pair whose union fits:
/// `score = 1 - (|union| - |group|) / |connection|`, i.e. less growth
/// relative to the connection's size wins. Ties prefer the larger
/// connection; remaining ties fall to iteration order (groups in creation
/// order, connections in lexicographic order). When nothing fits an
/// existing group, a new group is opened with the largest remaining
/// connection.
fn pack_bone_groups(mut pool: Vec<Vec<u16>>) -> Result<Vec<BoneGroup>> {
    let mut groups: Vec<BoneGroup> = Vec::new();

    while !pool.is_empty() {
        let mut best: Option<(f64, usize, usize, usize)> = None; // score, len, conn, group

        for (b, group) in groups.iter().enumerate() {
            for (g, connection) in pool.iter().enumerate() {
                let joined = join_unique(group, connection);
                if joined.len() > MAX_GROUP_SIZE {
                    continue;
                }
                let growth = (joined.len() - group.len()) as f64;
                let score = 1.0 - growth / connection.len() as f64;
                let better = match best {
                    None => true,
                    Some((best_score, best_len, _, _)) => {
                        score > best_score
                            || (score == best_score && connection.len() > best_len)
                    }
                };
                if better {
                    best = Some((score, connection.len(), g, b));
                }
            }
        }

        let (connection_index, group_index) = match best {
            Some((_, _, g, b)) => (g, b),
            None => {
                // No group can take anything: open a new one and seed it
                // with the largest remaining connection that fits at all.
                groups.push(Vec::new());
                let mut pick: Option<usize> = None;
                let mut pick_len = 0;
                for (g, connection) in pool.iter().enumerate() {
                    if connection.len() > pick_len && connection.len() <= MAX_GROUP_SIZE {
                        pick_len = connection.len();
                        pick = Some(g);
                    }
                }
                let Some(g) = pick else {
                    return Err(ProcyonError::Partition(format!(
                        "a triangle references more than {MAX_GROUP_SIZE} distinct joints"
                    )));
                };
                (g, groups.len() - 1)
            }
        };

        let connection = pool.remove(connection_index);
        let mut joined = join_unique(&groups[group_index], &connection);
        joined.sort_unstable();
        groups[group_index] = joined;
    }

    groups.sort();
    Ok(groups)
}

/// Rewrite every triangle into a bucket keyed by (material, bone group).
///
/// The winning group is the *last* one (in stored order) whose members
/// are a superset of the triangle's connection set; an empty connection
/// set matches every group. Each corner vertex is re-expressed with one
/// joint slot per group member, `-1` / `0.0` marking members the vertex
/// is not bound to.
fn rebucket(meshes: &[MeshBucket], groups: &[BoneGroup]) -> Result<Vec<MeshBucket>> {
    let mut rebucketed: Vec<MeshBucket> = Vec::new();

    for mesh in meshes {
        for t in 0..mesh.triangle_count() {
            let connection = connection_set(mesh, t);

            let mut subskeleton = -1i32;
            for (g, group) in groups.iter().enumerate() {
                if connection.iter().all(|j| group.contains(j)) {
                    subskeleton = g as i32;
                }
            }
            if subskeleton < 0 {
                return Err(ProcyonError::Partition(format!(
                    "no bone group covers connection set {connection:?}"
                )));
            }

            let bucket_index = match rebucketed.iter().position(|m| {
                m.material_index == mesh.material_index && m.subskeleton_index == subskeleton
            }) {
                Some(i) => i,
                None => {
                    rebucketed.push(MeshBucket::new(mesh.material_index, subskeleton));
                    rebucketed.len() - 1
                }
            };

            let group = &groups[subskeleton as usize];
            let bucket = &mut rebucketed[bucket_index];
            for index in mesh.triangle(t) {
                let old = &mesh.vertices()[index as usize];
                let rewritten = rewrite_vertex(old, group);
                let new_index = bucket.insert_vertex(rewritten);
                bucket.push_index(new_index);
            }
        }
    }

    rebucketed.sort_by_key(|m| (m.subskeleton_index, m.material_index));
    Ok(rebucketed)
}

/// Re-express a vertex's joint bindings as fixed-position slots following
/// the group's member order.
fn rewrite_vertex(old: &Vertex, group: &BoneGroup) -> Vertex {
    let mut rewritten = old.clone();
    rewritten.joint_indices = Vec::with_capacity(group.len());
    rewritten.joint_weights = Vec::with_capacity(group.len());
    for &member in group {
        match old.joint_indices.iter().position(|&j| j == i32::from(member)) {
            Some(slot) => {
                rewritten.joint_indices.push(i32::from(member));
                rewritten
                    .joint_weights
                    .push(old.joint_weights.get(slot).copied().unwrap_or(0.0));
            }
            None => {
                rewritten.joint_indices.push(-1);
                rewritten.joint_weights.push(0.0);
            }
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkeletonJoint;
    use glam::Mat4;

    fn skinned_vertex(x: f32, joints: &[i32], weights: &[f32]) -> Vertex {
        Vertex {
            position: [x, 0.0, 0.0],
            joint_indices: joints.to_vec(),
            joint_weights: weights.to_vec(),
            ..Default::default()
        }
    }

    fn push_triangle(mesh: &mut MeshBucket, base: f32, joints: &[i32], weights: &[f32]) {
        for c in 0..3 {
            let v = skinned_vertex(base + c as f32, joints, weights);
            let i = mesh.insert_vertex(v);
            mesh.push_index(i);
        }
    }

    fn joint(name: &str) -> SkeletonJoint {
        SkeletonJoint {
            name: name.into(),
            parent_index: -1,
            inverse_bind_pose: Mat4::IDENTITY,
        }
    }

    fn data_with(mesh: MeshBucket, joint_count: usize) -> ProcyonData {
        ProcyonData {
            meshes: vec![mesh],
            joints: (0..joint_count).map(|i| joint(&format!("j{i}"))).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn compatible_sets_pack_into_one_group() {
        // Both connection sets are mutually compatible within the 8-joint
        // capacity, so a single group covers everything.
        let mut mesh = MeshBucket::new(0, -1);
        push_triangle(&mut mesh, 0.0, &[0, 1, 2], &[0.4, 0.3, 0.3]);
        push_triangle(&mut mesh, 10.0, &[2, 3], &[0.5, 0.5]);

        let mut data = data_with(mesh, 4);
        partition(&mut data).unwrap();

        assert_eq!(data.bone_groups, vec![vec![0, 1, 2, 3]]);
        assert_eq!(data.meshes.len(), 1);
        assert_eq!(data.meshes[0].subskeleton_index, 0);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut mesh = MeshBucket::new(0, -1);
        // Twelve joints referenced in overlapping runs of five.
        for start in 0..8 {
            let joints: Vec<i32> = (start..start + 5).collect();
            let weights = vec![0.2; 5];
            push_triangle(&mut mesh, start as f32 * 100.0, &joints, &weights);
        }

        let mut data = data_with(mesh, 12);
        partition(&mut data).unwrap();

        assert!(!data.bone_groups.is_empty());
        for group in &data.bone_groups {
            assert!(group.len() <= MAX_GROUP_SIZE);
        }
    }

    #[test]
    fn every_joint_is_covered() {
        let mut mesh = MeshBucket::new(0, -1);
        push_triangle(&mut mesh, 0.0, &[1, 2], &[0.5, 0.5]);

        // Joints 0 and 3..6 are never referenced; singletons must cover them.
        let mut data = data_with(mesh, 7);
        partition(&mut data).unwrap();

        for j in 0..7u16 {
            assert!(
                data.bone_groups.iter().any(|g| g.contains(&j)),
                "joint {j} uncovered"
            );
        }
    }

    #[test]
    fn every_triangle_has_a_superset_group() {
        let mut mesh = MeshBucket::new(0, -1);
        let sets: [&[i32]; 4] = [&[0, 1], &[1, 2, 3], &[4, 5, 6, 7], &[7, 8]];
        for (i, joints) in sets.iter().enumerate() {
            let weights = vec![1.0 / joints.len() as f32; joints.len()];
            push_triangle(&mut mesh, i as f32 * 100.0, joints, &weights);
        }

        let mut data = data_with(mesh, 9);
        partition(&mut data).unwrap();

        for set in sets {
            let as_u16: Vec<u16> = set.iter().map(|&j| j as u16).collect();
            assert!(
                data.bone_groups
                    .iter()
                    .any(|g| as_u16.iter().all(|j| g.contains(j))),
                "no superset group for {set:?}"
            );
        }
    }

    #[test]
    fn oversized_connection_set_is_fatal() {
        let mut mesh = MeshBucket::new(0, -1);
        let joints: Vec<i32> = (0..9).collect();
        let weights = vec![1.0 / 9.0; 9];
        // Spread 9 joints over the three corners: 4 + 4 + 1.
        let corners = [
            skinned_vertex(0.0, &joints[0..4], &weights[0..4]),
            skinned_vertex(1.0, &joints[4..8], &weights[4..8]),
            skinned_vertex(2.0, &joints[8..9], &weights[8..9]),
        ];
        for v in corners {
            let i = mesh.insert_vertex(v);
            mesh.push_index(i);
        }

        let mut data = data_with(mesh, 9);
        let err = partition(&mut data).unwrap_err();
        assert!(matches!(err, ProcyonError::Partition(_)));
    }

    #[test]
    fn mismatched_binding_lists_ignore_the_excess() {
        // Vertex fields are public; a caller can hand over more weights
        // than indices (or the reverse). Unpaired slots carry no binding.
        let mut mesh = MeshBucket::new(0, -1);
        let corners = [
            skinned_vertex(0.0, &[0], &[0.5, 0.5]),
            skinned_vertex(1.0, &[0, 1], &[1.0]),
            skinned_vertex(2.0, &[0], &[1.0]),
        ];
        for v in corners {
            let i = mesh.insert_vertex(v);
            mesh.push_index(i);
        }

        assert_eq!(connection_set(&mesh, 0), vec![0]);

        let mut data = data_with(mesh, 1);
        partition(&mut data).unwrap();
        assert_eq!(data.bone_groups, vec![vec![0]]);
    }

    #[test]
    fn score_prefers_least_relative_growth() {
        // {0,1,2,3,4,5} seeds the first group. {0,1} joins it for free
        // (score 1) ahead of {6,7} (growth 2, score 0); {6,7} then fills
        // the group to capacity.
        let pool = vec![vec![0, 1], vec![0, 1, 2, 3, 4, 5], vec![6, 7]];
        let groups = pack_bone_groups(pool).unwrap();
        assert_eq!(groups, vec![vec![0, 1, 2, 3, 4, 5, 6, 7]]);
    }

    #[test]
    fn groups_are_sorted_lexicographically() {
        let mut mesh = MeshBucket::new(0, -1);
        let sets: [&[i32]; 2] = [&[8, 9, 10, 11, 12], &[0, 1, 2, 3, 4]];
        for (i, joints) in sets.iter().enumerate() {
            let weights = vec![0.2; joints.len()];
            push_triangle(&mut mesh, i as f32 * 100.0, joints, &weights);
        }

        let mut data = data_with(mesh, 13);
        partition(&mut data).unwrap();

        let mut sorted = data.bone_groups.clone();
        sorted.sort();
        assert_eq!(data.bone_groups, sorted);
    }

    #[test]
    fn rebucket_keeps_material_split() {
        let mut mesh_a = MeshBucket::new(0, -1);
        push_triangle(&mut mesh_a, 0.0, &[0, 1], &[0.5, 0.5]);
        let mut mesh_b = MeshBucket::new(1, -1);
        push_triangle(&mut mesh_b, 50.0, &[0, 1], &[0.5, 0.5]);

        let mut data = ProcyonData {
            meshes: vec![mesh_a, mesh_b],
            joints: (0..2).map(|i| joint(&format!("j{i}"))).collect(),
            ..Default::default()
        };
        partition(&mut data).unwrap();

        assert_eq!(data.meshes.len(), 2);
        assert_eq!(data.meshes[0].material_index, 0);
        assert_eq!(data.meshes[1].material_index, 1);
        assert_eq!(data.meshes[0].subskeleton_index, 0);
        assert_eq!(data.meshes[1].subskeleton_index, 0);
    }

    #[test]
    fn rebucket_sorts_by_subskeleton_then_material() {
        let mut mesh = MeshBucket::new(1, -1);
        push_triangle(&mut mesh, 0.0, &[0, 1, 2, 3, 4, 5, 6, 7], &[0.125; 8]);
        push_triangle(&mut mesh, 100.0, &[8, 9, 10, 11, 12, 13, 14, 15], &[0.125; 8]);

        let mut data = data_with(mesh, 16);
        partition(&mut data).unwrap();

        assert_eq!(data.meshes.len(), 2);
        let keys: Vec<(i32, i32)> = data
            .meshes
            .iter()
            .map(|m| (m.subskeleton_index, m.material_index))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn vertex_slots_follow_group_member_order() {
        let old = skinned_vertex(0.0, &[5, 2], &[0.7, 0.3]);
        let group: BoneGroup = vec![1, 2, 5];
        let rewritten = rewrite_vertex(&old, &group);

        assert_eq!(rewritten.joint_indices, vec![-1, 2, 5]);
        assert_eq!(rewritten.joint_weights, vec![0.0, 0.3, 0.7]);
        assert_eq!(rewritten.position, old.position);
    }

    #[test]
    fn tie_break_picks_last_matching_group() {
        // Overlapping groups: {0,1} is a subset of both. The triangle must
        // land in the later group in stored order.
        let mut mesh = MeshBucket::new(0, -1);
        push_triangle(&mut mesh, 0.0, &[0, 1], &[0.5, 0.5]);
        let groups: Vec<BoneGroup> = vec![vec![0, 1, 2], vec![0, 1, 3]];

        let rebucketed = rebucket(&[mesh], &groups).unwrap();
        assert_eq!(rebucketed.len(), 1);
        assert_eq!(rebucketed[0].subskeleton_index, 1);
    }

    #[test]
    fn deterministic_partition() {
        let build = || {
            let mut mesh = MeshBucket::new(0, -1);
            for start in 0..6 {
                let joints: Vec<i32> = (start..start + 4).collect();
                push_triangle(&mut mesh, start as f32 * 10.0, &joints, &[0.25; 4]);
            }
            data_with(mesh, 10)
        };

        let mut a = build();
        let mut b = build();
        partition(&mut a).unwrap();
        partition(&mut b).unwrap();

        assert_eq!(a.bone_groups, b.bone_groups);
        let keys = |d: &ProcyonData| {
            d.meshes
                .iter()
                .map(|m| (m.subskeleton_index, m.material_index, m.indices().to_vec()))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&a), keys(&b));
    }
}
