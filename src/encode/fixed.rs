//! Fixed (P3D) layout: columnar vertex streams addressed through global
//! vertex/index offsets, one table entry per mesh bucket.

use std::io::Write;

use tracing::debug;

use crate::encode::{
    write_animation_data, write_inverse_bind_matrices, Sink, ANIMATION_NAME_SIZE,
    TEXTURE_NAME_SIZE,
};
use crate::error::{ProcyonError, Result};
use crate::process::quantize::{color_to_uint32, float_to_int16, float_to_uint16};
use crate::types::{Material, ProcyonData};

pub const MAGIC: &str = " P3D";

/// Write the complete fixed layout in section order.
pub fn write_p3d<W: Write>(sink: &mut Sink<W>, data: &ProcyonData, asset_stem: &str) -> Result<()> {
    write_header(sink, data)?;
    write_mesh_table(sink, data, asset_stem)?;
    write_animation_table(sink, data)?;
    write_vertex_streams(sink, data)?;
    write_index_stream(sink, data)?;
    write_joint_parents(sink, data)?;
    write_inverse_bind_matrices(sink, data)?;
    write_animation_data(sink, data)?;
    sink.flush()
}

fn write_header<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    debug!("Writing P3D header");
    if data.joints.len() > usize::from(u8::MAX) {
        return Err(ProcyonError::Validation(format!(
            "{} joints exceed the fixed format's u8 joint count",
            data.joints.len()
        )));
    }
    sink.write_tag(MAGIC)?;
    sink.write_f32(data.scale)?;
    sink.write_u32(data.vertex_total)?;
    sink.write_u32(data.index_total)?;
    sink.write_u16(data.meshes.len() as u16)?;
    sink.write_u16(data.animations.len() as u16)?;
    sink.write_u16(data.total_frame_count() as u16)?;
    sink.write_u8(data.joints.len() as u8)?;
    sink.write_u8(0)?; // alignment
    Ok(())
}

fn write_mesh_table<W: Write>(
    sink: &mut Sink<W>,
    data: &ProcyonData,
    asset_stem: &str,
) -> Result<()> {
    for mesh in &data.meshes {
        sink.write_u32(mesh.index_count() as u32)?;
        sink.write_u32(mesh.index_offset)?;
        sink.write_u32(mesh.vertex_offset)?;

        let material = &data.materials[mesh.material_index as usize];
        sink.write_u32(color_to_uint32(material.diffuse_color))?;
        if material.diffuse_image.is_some() {
            let name = Material::texture_file_name(asset_stem, mesh.material_index as usize);
            sink.write_fixed_name(&name, TEXTURE_NAME_SIZE)?;
        } else {
            sink.write_fixed_name("", TEXTURE_NAME_SIZE)?;
        }
    }
    Ok(())
}

fn write_animation_table<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for animation in &data.animations {
        sink.write_fixed_name(&animation.name, ANIMATION_NAME_SIZE)?;
        sink.write_u16(animation.frames.len() as u16)?;
    }
    Ok(())
}

/// Columnar streams across all meshes: positions, then normals, then UVs,
/// then joint indices, then joint weights.
fn write_vertex_streams<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for mesh in &data.meshes {
        for vertex in mesh.vertices() {
            for e in 0..3 {
                sink.write_i16(float_to_int16(vertex.position[e] / data.scale, -1.0, 1.0))?;
            }
        }
    }
    for mesh in &data.meshes {
        for vertex in mesh.vertices() {
            for e in 0..3 {
                sink.write_i16(float_to_int16(vertex.normal[e], -1.0, 1.0))?;
            }
        }
    }
    for mesh in &data.meshes {
        for vertex in mesh.vertices() {
            for e in 0..2 {
                sink.write_i16(float_to_int16(vertex.uv[e], -1.0, 1.0))?;
            }
        }
    }
    for mesh in &data.meshes {
        for vertex in mesh.vertices() {
            for e in 0..4 {
                let joint = vertex.joint_indices.get(e).copied().unwrap_or(-1);
                sink.write_u8(if joint >= 0 { joint as u8 } else { u8::MAX })?;
            }
        }
    }
    for mesh in &data.meshes {
        for vertex in mesh.vertices() {
            for e in 0..4 {
                let weight = vertex.joint_weights.get(e).copied().unwrap_or(0.0);
                sink.write_u16(float_to_uint16(weight, 0.0, 1.0))?;
            }
        }
    }
    Ok(())
}

/// Bucket-local indices, flattened; the runtime offsets them with the
/// mesh table's `vertex_offset`.
fn write_index_stream<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for mesh in &data.meshes {
        for &index in mesh.indices() {
            sink.write_u32(index)?;
        }
    }
    Ok(())
}

fn write_joint_parents<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for joint in &data.joints {
        let parent = if joint.parent_index >= 0 {
            joint.parent_index as u8
        } else {
            u8::MAX
        };
        sink.write_u8(parent)?;
    }
    Ok(())
}
