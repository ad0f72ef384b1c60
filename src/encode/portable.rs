//! Portable (PP3D) layout: interleaved per-mesh vertex data, u16 indices,
//! materials in their own table, and one subskeleton entry per bone group.

use std::io::Write;

use tracing::debug;

use crate::config::WeightSize;
use crate::encode::{
    write_animation_data, write_inverse_bind_matrices, Sink, ANIMATION_NAME_SIZE,
    TEXTURE_NAME_SIZE,
};
use crate::error::Result;
use crate::process::quantize::{color_to_uint32, float_to_int16, float_to_int8};
use crate::types::{Material, ProcyonData};

pub const MAGIC: &str = "PP3D";

/// Write the complete portable layout in section order.
pub fn write_pp3d<W: Write>(
    sink: &mut Sink<W>,
    data: &ProcyonData,
    asset_stem: &str,
    weight_size: WeightSize,
) -> Result<()> {
    write_header(sink, data, weight_size)?;
    write_mesh_table(sink, data)?;
    write_material_table(sink, data, asset_stem)?;
    write_subskeleton_table(sink, data)?;
    write_animation_table(sink, data)?;
    write_mesh_data(sink, data, weight_size)?;
    write_joint_parents(sink, data)?;
    write_inverse_bind_matrices(sink, data)?;
    write_animation_data(sink, data)?;
    sink.flush()
}

fn write_header<W: Write>(
    sink: &mut Sink<W>,
    data: &ProcyonData,
    weight_size: WeightSize,
) -> Result<()> {
    debug!("Writing PP3D header");
    sink.write_tag(MAGIC)?;
    sink.write_f32(data.scale)?;
    sink.write_u16(data.meshes.len() as u16)?;
    sink.write_u16(data.materials.len() as u16)?;
    sink.write_u16(data.bone_groups.len() as u16)?;
    sink.write_u16(data.animations.len() as u16)?;
    sink.write_u16(data.joints.len() as u16)?;
    sink.write_u16(data.total_frame_count() as u16)?;
    sink.write_i8(weight_size.byte_size() as i8)?;
    for _ in 0..3 {
        sink.write_u8(0)?; // alignment
    }
    Ok(())
}

fn write_mesh_table<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for mesh in &data.meshes {
        let material = if mesh.material_index >= 0 {
            mesh.material_index as u16
        } else {
            u16::MAX
        };
        sink.write_u16(material)?;
        let subskeleton = if mesh.subskeleton_index >= 0 {
            mesh.subskeleton_index as u16
        } else {
            u16::MAX
        };
        sink.write_u16(subskeleton)?;
        sink.write_u16(mesh.vertex_count() as u16)?;
        sink.write_u16(mesh.index_count() as u16)?;
    }
    Ok(())
}

fn write_material_table<W: Write>(
    sink: &mut Sink<W>,
    data: &ProcyonData,
    asset_stem: &str,
) -> Result<()> {
    for (m, material) in data.materials.iter().enumerate() {
        sink.write_u32(color_to_uint32(material.diffuse_color))?;
        if material.diffuse_image.is_some() {
            let name = Material::texture_file_name(asset_stem, m);
            sink.write_fixed_name(&name, TEXTURE_NAME_SIZE)?;
        } else {
            sink.write_fixed_name("", TEXTURE_NAME_SIZE)?;
        }
    }
    Ok(())
}

/// One entry per bone group: member count, eight u8 slots padded with 255,
/// then alignment.
fn write_subskeleton_table<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for group in &data.bone_groups {
        sink.write_u8(group.len() as u8)?;
        for b in 0..8 {
            let joint = group.get(b).map(|&j| j as u8).unwrap_or(u8::MAX);
            sink.write_u8(joint)?;
        }
        for _ in 0..3 {
            sink.write_u8(0)?; // alignment
        }
    }
    Ok(())
}

fn write_animation_table<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for animation in &data.animations {
        sink.write_fixed_name(&animation.name, ANIMATION_NAME_SIZE)?;
        sink.write_u16(animation.frames.len() as u16)?;
        sink.write_u16(0)?; // alignment
    }
    Ok(())
}

/// Per mesh: interleaved vertices, then the u16 index list. Each vertex is
/// bone weights (in subskeleton slot order), UVs when the material carries
/// a texture, normal, position.
fn write_mesh_data<W: Write>(
    sink: &mut Sink<W>,
    data: &ProcyonData,
    weight_size: WeightSize,
) -> Result<()> {
    for mesh in &data.meshes {
        let textured = data.materials[mesh.material_index as usize]
            .diffuse_image
            .is_some();
        for vertex in mesh.vertices() {
            write_vertex_weights(sink, &vertex.joint_weights, weight_size)?;
            if textured {
                for e in 0..2 {
                    sink.write_i16(float_to_int16(vertex.uv[e], -1.0, 1.0))?;
                }
            }
            for e in 0..3 {
                sink.write_i16(float_to_int16(vertex.normal[e], -1.0, 1.0))?;
            }
            for e in 0..3 {
                sink.write_i16(float_to_int16(vertex.position[e] / data.scale, -1.0, 1.0))?;
            }
        }
        for &index in mesh.indices() {
            sink.write_u16(index as u16)?;
        }
    }
    Ok(())
}

fn write_vertex_weights<W: Write>(
    sink: &mut Sink<W>,
    weights: &[f32],
    weight_size: WeightSize,
) -> Result<()> {
    for &weight in weights {
        match weight_size {
            WeightSize::Byte => sink.write_i8(float_to_int8(weight, -1.0, 1.0))?,
            WeightSize::Short => sink.write_i16(float_to_int16(weight, -1.0, 1.0))?,
            WeightSize::Float => sink.write_f32(weight)?,
        }
    }
    let total = weights.len() * usize::from(weight_size.byte_size());
    if total % 2 == 1 {
        sink.write_u8(0)?; // pad to 16 bits
    }
    Ok(())
}

fn write_joint_parents<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for joint in &data.joints {
        let parent = if joint.parent_index >= 0 {
            joint.parent_index as u16
        } else {
            u16::MAX
        };
        sink.write_u16(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MeshBucket, Vertex};

    fn triangle_vertices() -> [Vertex; 3] {
        [
            Vertex {
                position: [0.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
            Vertex {
                position: [1.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
            Vertex {
                position: [0.0, 1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
        ]
    }

    fn flat_data() -> ProcyonData {
        let mut mesh = MeshBucket::new(0, -1);
        for corner in triangle_vertices() {
            let index = mesh.insert_vertex(corner);
            mesh.push_index(index);
        }
        let mut data = ProcyonData {
            meshes: vec![mesh],
            materials: vec![Material::dummy()],
            ..Default::default()
        };
        data.finalize_offsets();
        data
    }

    fn encode(data: &ProcyonData, weight_size: WeightSize) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut sink = Sink::new(&mut buf, false);
        write_pp3d(&mut sink, data, "asset", weight_size).unwrap();
        drop(sink);
        buf
    }

    #[test]
    fn header_layout() {
        let bytes = encode(&flat_data(), WeightSize::Byte);

        assert_eq!(&bytes[0..4], b"PP3D");
        assert_eq!(f32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1.0);
        assert_eq!(u16::from_le_bytes(bytes[8..10].try_into().unwrap()), 1); // meshes
        assert_eq!(u16::from_le_bytes(bytes[10..12].try_into().unwrap()), 1); // materials
        assert_eq!(u16::from_le_bytes(bytes[12..14].try_into().unwrap()), 0); // bone groups
        assert_eq!(u16::from_le_bytes(bytes[14..16].try_into().unwrap()), 0); // animations
        assert_eq!(u16::from_le_bytes(bytes[16..18].try_into().unwrap()), 0); // joints
        assert_eq!(u16::from_le_bytes(bytes[18..20].try_into().unwrap()), 0); // frames
        assert_eq!(bytes[20] as i8, 1); // weight size
        assert_eq!(&bytes[21..24], &[0, 0, 0]);
    }

    #[test]
    fn mesh_entry_uses_sentinel_for_missing_subskeleton() {
        let bytes = encode(&flat_data(), WeightSize::Byte);

        let entry = &bytes[24..32];
        assert_eq!(u16::from_le_bytes(entry[0..2].try_into().unwrap()), 0);
        assert_eq!(
            u16::from_le_bytes(entry[2..4].try_into().unwrap()),
            u16::MAX
        );
        assert_eq!(u16::from_le_bytes(entry[4..6].try_into().unwrap()), 3);
        assert_eq!(u16::from_le_bytes(entry[6..8].try_into().unwrap()), 3);
    }

    #[test]
    fn untextured_vertex_skips_uvs() {
        let data = flat_data();
        let bytes = encode(&data, WeightSize::Byte);

        // header 24 + mesh table 8 + material table 52, then mesh data.
        // Unskinned vertex with no texture: normal (6) + position (6).
        let vertex_size = 12;
        let expected = 24 + 8 + 52 + 3 * vertex_size + 3 * 2;
        assert_eq!(bytes.len(), expected);

        // Second vertex position x = 1.0 -> 32767 in the last i16 triple.
        let v1 = &bytes[24 + 8 + 52 + vertex_size..];
        assert_eq!(i16::from_le_bytes(v1[6..8].try_into().unwrap()), 32767);
    }

    #[test]
    fn odd_weight_payload_padded_to_16_bits() {
        let mut mesh = MeshBucket::new(0, 0);
        let mut vertices = triangle_vertices();
        for vertex in &mut vertices {
            vertex.joint_indices = vec![0, 1, 2];
            vertex.joint_weights = vec![1.0, 0.0, 0.0];
        }
        for corner in vertices {
            let index = mesh.insert_vertex(corner);
            mesh.push_index(index);
        }
        let mut data = ProcyonData {
            meshes: vec![mesh],
            materials: vec![Material::dummy()],
            bone_groups: vec![vec![0, 1, 2]],
            ..Default::default()
        };
        data.finalize_offsets();

        let bytes = encode(&data, WeightSize::Byte);
        // 3 weight bytes + 1 pad + normal + position per vertex.
        let vertex_size = 4 + 6 + 6;
        // header + mesh table + material table + subskeleton entry.
        let mesh_data = 24 + 8 + 52 + 12;
        assert_eq!(bytes.len(), mesh_data + 3 * vertex_size + 3 * 2);

        // First vertex: weight 1.0 -> 127, then two zeros, then pad.
        let v0 = &bytes[mesh_data..];
        assert_eq!(v0[0] as i8, 127);
        assert_eq!(&v0[1..4], &[0, 0, 0]);
    }

    #[test]
    fn float_weights_written_raw() {
        let mut mesh = MeshBucket::new(0, 0);
        let mut vertices = triangle_vertices();
        for vertex in &mut vertices {
            vertex.joint_indices = vec![3, 5];
            vertex.joint_weights = vec![0.75, 0.25];
        }
        for corner in vertices {
            let index = mesh.insert_vertex(corner);
            mesh.push_index(index);
        }
        let mut data = ProcyonData {
            meshes: vec![mesh],
            materials: vec![Material::dummy()],
            bone_groups: vec![vec![3, 5]],
            ..Default::default()
        };
        data.finalize_offsets();

        let bytes = encode(&data, WeightSize::Float);
        assert_eq!(bytes[20] as i8, 4);

        let mesh_data = 24 + 8 + 52 + 12;
        let v0 = &bytes[mesh_data..];
        assert_eq!(f32::from_le_bytes(v0[0..4].try_into().unwrap()), 0.75);
        assert_eq!(f32::from_le_bytes(v0[4..8].try_into().unwrap()), 0.25);
    }

    #[test]
    fn subskeleton_entries_pad_with_sentinel() {
        let mut data = flat_data();
        data.bone_groups = vec![vec![0, 2, 7]];
        let bytes = encode(&data, WeightSize::Byte);

        let entry = &bytes[24 + 8 + 52..];
        assert_eq!(entry[0], 3);
        assert_eq!(&entry[1..4], &[0, 2, 7]);
        assert!(entry[4..9].iter().all(|&b| b == u8::MAX));
        assert_eq!(&entry[9..12], &[0, 0, 0]);
    }

    #[test]
    fn no_skeleton_leaves_tables_empty() {
        let bytes = encode(&flat_data(), WeightSize::Byte);
        assert_eq!(u16::from_le_bytes(bytes[12..14].try_into().unwrap()), 0);
        assert_eq!(u16::from_le_bytes(bytes[16..18].try_into().unwrap()), 0);
    }

    #[test]
    fn deterministic_bytes() {
        let data = flat_data();
        assert_eq!(
            encode(&data, WeightSize::Short),
            encode(&data, WeightSize::Short)
        );
    }
}
