use criterion::{criterion_group, criterion_main, Criterion};
use glam::Mat4;
use procyon_export::process::{assemble, partition};
use procyon_export::scene::{SceneDescription, SceneTriangle};
use procyon_export::types::{Material, SkeletonJoint, Vertex};

/// Skinned scene with overlapping sliding-window joint bindings, the worst
/// case for the greedy grouping (many distinct connection sets).
fn make_skinned_scene(joint_count: usize, triangle_count: usize) -> SceneDescription {
    let joints = (0..joint_count)
        .map(|j| SkeletonJoint {
            name: format!("joint_{j}"),
            parent_index: if j == 0 { -1 } else { (j - 1) as i32 },
            inverse_bind_pose: Mat4::IDENTITY,
        })
        .collect();

    let mut triangles = Vec::with_capacity(triangle_count);
    for t in 0..triangle_count {
        let first = t % (joint_count - 2);
        let bound = [first as i32, first as i32 + 1, first as i32 + 2];
        let corner = |c: usize| Vertex {
            position: [t as f32, c as f32, 0.0],
            normal: [0.0, 0.0, 1.0],
            joint_indices: bound.to_vec(),
            joint_weights: vec![0.5, 0.3, 0.2],
            ..Default::default()
        };
        triangles.push(SceneTriangle {
            corners: [corner(0), corner(1), corner(2)],
            material_index: 0,
        });
    }

    SceneDescription {
        triangles,
        materials: vec![Material::dummy()],
        joints,
        ..Default::default()
    }
}

fn bench_partition(c: &mut Criterion) {
    let small = assemble(&make_skinned_scene(16, 500));
    c.bench_function("partition_16_joints_500_tris", |b| {
        b.iter(|| {
            let mut data = small.clone();
            partition(&mut data).unwrap();
        });
    });

    let large = assemble(&make_skinned_scene(64, 4000));
    c.bench_function("partition_64_joints_4k_tris", |b| {
        b.iter(|| {
            let mut data = large.clone();
            partition(&mut data).unwrap();
        });
    });
}

criterion_group!(benches, bench_partition);
criterion_main!(benches);
