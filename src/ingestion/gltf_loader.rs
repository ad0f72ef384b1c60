//! glTF/GLB loader: resolves a source file into the scene description
//! consumed by the pipeline (triangles, materials, skin, sampled clips).

use std::collections::HashMap;
use std::path::Path;

use glam::{Mat3, Mat4, Quat, Vec3};
use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::error::{ProcyonError, Result};
use crate::ingestion::axes;
use crate::scene::{SceneDescription, SceneTriangle};
use crate::types::{
    normalized_weights, Animation, AnimationFrame, JointPose, Material, SkeletonJoint, Vertex,
    MAX_INFLUENCES,
};

/// Fixed clip sample rate in frames per second.
pub const SAMPLE_RATE: f32 = 24.0;

/// Load a glTF or GLB file into a [`SceneDescription`].
pub fn load_gltf(path: &Path, config: &ExportConfig) -> Result<SceneDescription> {
    let (document, buffers, images) = gltf::import(path)
        .map_err(|e| ProcyonError::Input(format!("Failed to load glTF: {e}")))?;

    debug!(
        meshes = document.meshes().len(),
        materials = document.materials().len(),
        skins = document.skins().count(),
        animations = document.animations().len(),
        "Loaded glTF document"
    );

    let axis = axes::conversion_matrix(config.forward, config.up)?;

    let mut scene = SceneDescription::default();
    let mut materials = MaterialPool::new(if config.materials_enabled {
        convert_materials(&document, &images)
    } else {
        Vec::new()
    });

    let skin = single_skin(&document)?;
    let skin_joints: Vec<gltf::Node<'_>> = skin
        .iter()
        .flat_map(|s| s.joints())
        .collect();
    if let Some(ref skin) = skin {
        scene.joints = convert_skin(skin, &skin_joints, &buffers, axis)?;
    }

    for (node, world) in node_worlds(&document) {
        let Some(mesh) = node.mesh() else { continue };
        // Skinned geometry is authored in skin space; the node transform
        // does not apply to it.
        let vertex_matrix = if node.skin().is_some() {
            Mat4::from_mat3(axis)
        } else {
            Mat4::from_mat3(axis) * world
        };
        for primitive in mesh.primitives() {
            extract_primitive(&primitive, &buffers, vertex_matrix, &mut scene, &mut materials)?;
        }
    }

    if skin.is_some() {
        for (a, animation) in document.animations().enumerate() {
            let name = animation
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("animation_{a}"));
            if is_numbered_duplicate(&name) {
                debug!(name = %name, "Skipping numbered duplicate clip");
                continue;
            }
            if let Some(clip) = sample_animation(&animation, name, &skin_joints, &buffers, axis)? {
                scene.animations.push(clip);
            }
        }
    } else if document.animations().len() > 0 {
        warn!("Animations present but no skin; skipping all clips");
    }

    Ok(scene)
}

/// At most one skin is supported; a second one is a hard error rather than
/// a silent pick.
fn single_skin<'a>(document: &'a gltf::Document) -> Result<Option<gltf::Skin<'a>>> {
    let mut skins = document.skins();
    let first = skins.next();
    if skins.next().is_some() {
        return Err(ProcyonError::Scene(
            "More than one skin in the source file".into(),
        ));
    }
    Ok(first)
}

/// Flattened (node, world transform) pairs of the default scene.
fn node_worlds<'a>(document: &'a gltf::Document) -> Vec<(gltf::Node<'a>, Mat4)> {
    let mut worlds = Vec::new();
    let scenes: Vec<_> = document
        .default_scene()
        .into_iter()
        .chain(document.scenes().take(1))
        .take(1)
        .collect();
    for scene in scenes {
        for node in scene.nodes() {
            visit_node(&node, Mat4::IDENTITY, &mut worlds);
        }
    }
    worlds
}

fn visit_node<'a>(node: &gltf::Node<'a>, parent: Mat4, out: &mut Vec<(gltf::Node<'a>, Mat4)>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    out.push((node.clone(), world));
    for child in node.children() {
        visit_node(&child, world, out);
    }
}

fn convert_materials(document: &gltf::Document, images: &[gltf::image::Data]) -> Vec<Material> {
    let mut materials = Vec::new();
    for material in document.materials() {
        let pbr = material.pbr_metallic_roughness();
        let diffuse_image = pbr
            .base_color_texture()
            .and_then(|info| convert_image(&images[info.texture().source().index()]));
        materials.push(Material {
            diffuse_color: pbr.base_color_factor(),
            diffuse_image,
        });
    }
    materials
}

/// Decode glTF image pixels into RGBA8. Unhandled pixel formats degrade to
/// an untextured material.
fn convert_image(data: &gltf::image::Data) -> Option<image::RgbaImage> {
    let pixel_count = (data.width * data.height) as usize;
    let rgba = match data.format {
        gltf::image::Format::R8G8B8A8 => data.pixels.clone(),
        gltf::image::Format::R8G8B8 => {
            let mut rgba = Vec::with_capacity(pixel_count * 4);
            for rgb in data.pixels.chunks_exact(3) {
                rgba.extend_from_slice(rgb);
                rgba.push(255);
            }
            rgba
        }
        format => {
            warn!(?format, "Unsupported texture pixel format");
            return None;
        }
    };
    image::RgbaImage::from_raw(data.width, data.height, rgba)
}

/// Materials converted from the source document, moved into the scene
/// table on first face reference. The table then holds only materials a
/// face actually draws with, in discovery order.
struct MaterialPool {
    pending: Vec<Option<Material>>,
    slots: Vec<Option<usize>>,
    dummy: Option<usize>,
}

impl MaterialPool {
    fn new(candidates: Vec<Material>) -> Self {
        let slots = vec![None; candidates.len()];
        Self {
            pending: candidates.into_iter().map(Some).collect(),
            slots,
            dummy: None,
        }
    }

    /// Scene table index for a source material index, substituting a
    /// shared dummy entry when the source has none (or materials are
    /// disabled).
    fn slot_for(&mut self, source: Option<usize>, scene: &mut SceneDescription) -> usize {
        if let Some(index) = source {
            if let Some(Some(slot)) = self.slots.get(index) {
                return *slot;
            }
            if let Some(material) = self.pending.get_mut(index).and_then(|p| p.take()) {
                scene.materials.push(material);
                let slot = scene.materials.len() - 1;
                self.slots[index] = Some(slot);
                return slot;
            }
        }
        *self.dummy.get_or_insert_with(|| {
            debug!("Substituting dummy material");
            scene.materials.push(Material::dummy());
            scene.materials.len() - 1
        })
    }
}

fn extract_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    vertex_matrix: Mat4,
    scene: &mut SceneDescription,
    materials: &mut MaterialPool,
) -> Result<()> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return Err(ProcyonError::Input(format!(
            "Unsupported primitive mode {:?}",
            primitive.mode()
        )));
    }

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| ProcyonError::Input("Primitive missing positions".into()))?
        .collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|iter| iter.into_f32().collect())
        .unwrap_or_default();
    let colors: Vec<[f32; 4]> = reader
        .read_colors(0)
        .map(|iter| iter.into_rgba_f32().collect())
        .unwrap_or_default();
    let joints: Vec<[u16; 4]> = reader
        .read_joints(0)
        .map(|iter| iter.into_u16().collect())
        .unwrap_or_default();
    let weights: Vec<[f32; 4]> = reader
        .read_weights(0)
        .map(|iter| iter.into_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let material_index = materials.slot_for(primitive.material().index(), scene);
    let normal_matrix = Mat3::from_mat4(vertex_matrix).inverse().transpose();

    for triple in indices.chunks_exact(3) {
        let corners = [
            corner_vertex(
                triple[0] as usize,
                &positions,
                &normals,
                &uvs,
                &colors,
                &joints,
                &weights,
                vertex_matrix,
                normal_matrix,
            ),
            corner_vertex(
                triple[1] as usize,
                &positions,
                &normals,
                &uvs,
                &colors,
                &joints,
                &weights,
                vertex_matrix,
                normal_matrix,
            ),
            corner_vertex(
                triple[2] as usize,
                &positions,
                &normals,
                &uvs,
                &colors,
                &joints,
                &weights,
                vertex_matrix,
                normal_matrix,
            ),
        ];
        scene.triangles.push(SceneTriangle {
            corners,
            material_index,
        });
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn corner_vertex(
    v: usize,
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    colors: &[[f32; 4]],
    joints: &[[u16; 4]],
    weights: &[[f32; 4]],
    vertex_matrix: Mat4,
    normal_matrix: Mat3,
) -> Vertex {
    let position = vertex_matrix.transform_point3(Vec3::from(positions[v]));

    let normal = match normals.get(v) {
        Some(&n) => {
            let n = normal_matrix * Vec3::from(n);
            n.normalize_or_zero()
        }
        None => Vec3::ZERO,
    };

    // Source V runs top-down; the runtime samples bottom-up.
    let uv = uvs.get(v).map(|&[u, vv]| [u, 1.0 - vv]).unwrap_or([0.0, 0.0]);
    let color = colors.get(v).copied().unwrap_or([1.0, 1.0, 1.0, 1.0]);

    let (joint_indices, joint_weights) = influences(
        joints.get(v).copied().unwrap_or([0; 4]),
        weights.get(v).copied().unwrap_or([0.0; 4]),
    );

    Vertex {
        position: position.to_array(),
        uv,
        normal: normal.to_array(),
        color,
        joint_indices,
        joint_weights,
    }
}

/// Reduce raw joint/weight attribute slots to the carried influences:
/// positive weights only, at most [`MAX_INFLUENCES`], normalized to sum 1.
fn influences(joints: [u16; 4], weights: [f32; 4]) -> (Vec<i32>, Vec<f32>) {
    let mut indices = Vec::new();
    let mut raw = Vec::new();
    for (joint, weight) in joints.into_iter().zip(weights) {
        if weight > 0.0 && raw.len() < MAX_INFLUENCES {
            indices.push(i32::from(joint));
            raw.push(weight);
        }
    }
    let normalized = normalized_weights(&raw);
    if normalized.is_empty() {
        indices.clear();
    }
    (indices, normalized)
}

fn convert_skin(
    skin: &gltf::Skin<'_>,
    skin_joints: &[gltf::Node<'_>],
    buffers: &[gltf::buffer::Data],
    axis: Mat3,
) -> Result<Vec<SkeletonJoint>> {
    // Parent slots resolved through the child lists, within the skin only.
    let slot_of: HashMap<usize, usize> = skin_joints
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.index(), slot))
        .collect();
    let mut parents = vec![-1i32; skin_joints.len()];
    for (slot, node) in skin_joints.iter().enumerate() {
        for child in node.children() {
            if let Some(&child_slot) = slot_of.get(&child.index()) {
                parents[child_slot] = slot as i32;
            }
        }
    }

    let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
    let matrices: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
        Some(iter) => iter.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
        None => vec![Mat4::IDENTITY; skin_joints.len()],
    };
    if matrices.len() != skin_joints.len() {
        return Err(ProcyonError::Input(format!(
            "Skin has {} joints but {} inverse bind matrices",
            skin_joints.len(),
            matrices.len()
        )));
    }

    // Exported positions are axis mapped, so the bind inverse has to undo
    // the mapping first.
    let axis_inverse = Mat4::from_mat3(axis.transpose());

    let joints = skin_joints
        .iter()
        .zip(matrices)
        .enumerate()
        .map(|(slot, (node, matrix))| SkeletonJoint {
            name: node
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("joint_{slot}")),
            parent_index: parents[slot],
            inverse_bind_pose: matrix * axis_inverse,
        })
        .collect();
    Ok(joints)
}

/// Sample one clip at [`SAMPLE_RATE`]. Returns `None` for zero-duration
/// clips (nothing to sample).
fn sample_animation(
    animation: &gltf::Animation<'_>,
    name: String,
    skin_joints: &[gltf::Node<'_>],
    buffers: &[gltf::buffer::Data],
    axis: Mat3,
) -> Result<Option<Animation>> {
    let slot_of: HashMap<usize, usize> = skin_joints
        .iter()
        .enumerate()
        .map(|(slot, node)| (node.index(), slot))
        .collect();

    let mut duration = 0.0f32;
    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        if let Some(last) = reader.read_inputs().and_then(|times| times.last()) {
            duration = duration.max(last);
        }
    }
    if duration <= 0.0 {
        warn!(name = %name, "Clip has zero duration; skipping");
        return Ok(None);
    }
    let frame_count = (duration * SAMPLE_RATE).ceil() as usize;

    // Rest pose everywhere a channel does not drive a joint.
    let rest: Vec<JointPose> = skin_joints
        .iter()
        .map(|node| {
            let (t, r, s) = node.transform().decomposed();
            JointPose {
                translation: Vec3::from(t),
                rotation: Quat::from_array(r),
                scale: Vec3::from(s),
            }
        })
        .collect();
    let mut frames: Vec<AnimationFrame> = (0..frame_count)
        .map(|_| AnimationFrame {
            joints: rest.clone(),
        })
        .collect();

    for channel in animation.channels() {
        let Some(&slot) = slot_of.get(&channel.target().node().index()) else {
            continue;
        };
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        let Some(times) = reader.read_inputs().map(|iter| iter.collect::<Vec<_>>()) else {
            continue;
        };
        let Some(outputs) = reader.read_outputs() else {
            continue;
        };

        match outputs {
            gltf::animation::util::ReadOutputs::Translations(iter) => {
                let values: Vec<Vec3> = iter.map(Vec3::from).collect();
                for (f, frame) in frames.iter_mut().enumerate() {
                    let t = f as f32 / SAMPLE_RATE;
                    frame.joints[slot].translation = sample_vec3(&times, &values, t);
                }
            }
            gltf::animation::util::ReadOutputs::Rotations(iter) => {
                let values: Vec<Quat> = iter.into_f32().map(Quat::from_array).collect();
                for (f, frame) in frames.iter_mut().enumerate() {
                    let t = f as f32 / SAMPLE_RATE;
                    frame.joints[slot].rotation = sample_quat(&times, &values, t);
                }
            }
            gltf::animation::util::ReadOutputs::Scales(iter) => {
                let values: Vec<Vec3> = iter.map(Vec3::from).collect();
                for (f, frame) in frames.iter_mut().enumerate() {
                    let t = f as f32 / SAMPLE_RATE;
                    frame.joints[slot].scale = sample_vec3(&times, &values, t);
                }
            }
            gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {}
        }
    }

    // Root joints carry the axis mapping into the exported pose stream.
    let axis_rotation = Quat::from_mat3(&axis);
    let roots: Vec<usize> = (0..skin_joints.len())
        .filter(|&slot| {
            let node_index = skin_joints[slot].index();
            !skin_joints
                .iter()
                .any(|candidate| candidate.children().any(|c| c.index() == node_index))
        })
        .collect();
    for frame in &mut frames {
        for &slot in &roots {
            let pose = &mut frame.joints[slot];
            pose.translation = axis * pose.translation;
            pose.rotation = axis_rotation * pose.rotation;
        }
    }

    debug!(name = %name, frames = frames.len(), "Sampled clip");
    Ok(Some(Animation { name, frames }))
}

/// Locate the keyframe segment containing `t` and the blend factor inside
/// it. Clamps outside the keyed range.
fn segment(times: &[f32], t: f32) -> (usize, usize, f32) {
    if times.len() < 2 {
        return (0, 0, 0.0);
    }
    let mut i = 0;
    while i < times.len() - 1 && times[i + 1] < t {
        i += 1;
    }
    if i >= times.len() - 1 {
        return (times.len() - 1, times.len() - 1, 0.0);
    }
    let t0 = times[i];
    let t1 = times[i + 1];
    let factor = if t1 > t0 {
        ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (i, i + 1, factor)
}

fn sample_vec3(times: &[f32], values: &[Vec3], t: f32) -> Vec3 {
    if values.is_empty() {
        return Vec3::ZERO;
    }
    let (a, b, factor) = segment(times, t);
    values[a].lerp(values[b.min(values.len() - 1)], factor)
}

fn sample_quat(times: &[f32], values: &[Quat], t: f32) -> Quat {
    if values.is_empty() {
        return Quat::IDENTITY;
    }
    let (a, b, factor) = segment(times, t);
    values[a].slerp(values[b.min(values.len() - 1)], factor)
}

/// Blender-style numbered duplicates ("walk.001") are copies of clips that
/// already exist under the base name.
fn is_numbered_duplicate(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 4
        && bytes[bytes.len() - 4] == b'.'
        && bytes[bytes.len() - 3..]
            .iter()
            .all(|b| b.is_ascii_digit())
}
