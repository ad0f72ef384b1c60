//! Binary encoders for the two Procyon layouts.
//!
//! Both writers are pure, single-pass, little-endian, and byte-exact:
//! given the same finalized [`ProcyonData`] they produce identical bytes.
//! The ASCII sink mirrors every scalar as a space-separated decimal token
//! in the same section order, for inspection only.

pub mod fixed;
pub mod portable;

use std::io::Write;

use crate::error::{ProcyonError, Result};
use crate::types::{Material, ProcyonData};

/// Fixed storage width of a texture file name, zero padding included.
pub const TEXTURE_NAME_SIZE: usize = 48;
/// Fixed storage width of an animation name, zero padding included.
pub const ANIMATION_NAME_SIZE: usize = 64;

/// Scalar sink shared by both encoders: little-endian binary, or decimal
/// text when `ascii` is set.
pub struct Sink<W: Write> {
    inner: W,
    ascii: bool,
}

impl<W: Write> Sink<W> {
    pub fn new(inner: W, ascii: bool) -> Self {
        Self { inner, ascii }
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        if self.ascii {
            write!(self.inner, "{v} ")?;
        } else {
            self.inner.write_all(&[v])?;
        }
        Ok(())
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        if self.ascii {
            write!(self.inner, "{v} ")?;
        } else {
            self.inner.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        if self.ascii {
            write!(self.inner, "{v} ")?;
        } else {
            self.inner.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        if self.ascii {
            write!(self.inner, "{v} ")?;
        } else {
            self.inner.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        if self.ascii {
            write!(self.inner, "{v} ")?;
        } else {
            self.inner.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        if self.ascii {
            write!(self.inner, "{v} ")?;
        } else {
            self.inner.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    /// Write a run of f32 values. In binary mode the slice is emitted in
    /// one cast write (output is little-endian, like every target the
    /// runtime ships on).
    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        if self.ascii {
            for &v in values {
                self.write_f32(v)?;
            }
        } else {
            self.inner.write_all(bytemuck::cast_slice(values))?;
        }
        Ok(())
    }

    /// Write a raw ASCII tag (the 4-byte magic).
    pub fn write_tag(&mut self, tag: &str) -> Result<()> {
        self.inner.write_all(tag.as_bytes())?;
        Ok(())
    }

    /// Write `name` into a fixed-width field, zero padded. The name must
    /// be strictly shorter than `width` so at least one NUL terminates it.
    pub fn write_fixed_name(&mut self, name: &str, width: usize) -> Result<()> {
        if name.len() >= width {
            return Err(ProcyonError::Validation(format!(
                "name '{name}' does not fit in {width} bytes"
            )));
        }
        if self.ascii {
            write!(self.inner, "{name}")?;
        } else {
            self.inner.write_all(name.as_bytes())?;
        }
        for _ in 0..width - name.len() {
            self.write_u8(0)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Check every fatal naming, material, and count condition before the
/// first byte is written, so a failed export never leaves a
/// plausible-looking file. The portable layout stores per-mesh vertex and
/// index counts (and index values) as u16, so buckets past that cap must
/// abort instead of wrapping.
pub fn validate(data: &ProcyonData, asset_stem: &str, portable: bool) -> Result<()> {
    for animation in &data.animations {
        if animation.name.len() >= ANIMATION_NAME_SIZE {
            return Err(ProcyonError::Validation(format!(
                "animation name '{}' exceeds {} bytes",
                animation.name,
                ANIMATION_NAME_SIZE - 1
            )));
        }
    }
    for (m, material) in data.materials.iter().enumerate() {
        if material.diffuse_image.is_some() {
            let name = Material::texture_file_name(asset_stem, m);
            if name.len() >= TEXTURE_NAME_SIZE {
                return Err(ProcyonError::Validation(format!(
                    "texture name '{name}' exceeds {} bytes",
                    TEXTURE_NAME_SIZE - 1
                )));
            }
        }
    }
    for (m, mesh) in data.meshes.iter().enumerate() {
        if mesh.material_index < 0 {
            return Err(ProcyonError::Validation(format!(
                "mesh {m} has an unresolved material index"
            )));
        }
        let index = mesh.material_index as usize;
        if index >= data.materials.len() {
            return Err(ProcyonError::Validation(format!(
                "mesh {m} references material {index} of {}",
                data.materials.len()
            )));
        }
        if portable
            && (mesh.vertex_count() > u16::MAX as usize || mesh.index_count() > u16::MAX as usize)
        {
            return Err(ProcyonError::Validation(format!(
                "mesh {m} has {} vertices and {} indices; the portable layout stores both as u16",
                mesh.vertex_count(),
                mesh.index_count()
            )));
        }
    }
    Ok(())
}

/// Per-joint inverse bind matrices, 16 f32 each, column-major. Shared by
/// both layouts.
fn write_inverse_bind_matrices<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for joint in &data.joints {
        sink.write_f32_slice(&joint.inverse_bind_pose.to_cols_array())?;
    }
    Ok(())
}

/// Per-animation, per-frame, per-joint local transforms. Shared by both
/// layouts.
fn write_animation_data<W: Write>(sink: &mut Sink<W>, data: &ProcyonData) -> Result<()> {
    for animation in &data.animations {
        for frame in &animation.frames {
            for pose in &frame.joints {
                sink.write_f32(pose.translation.x)?;
                sink.write_f32(pose.translation.y)?;
                sink.write_f32(pose.translation.z)?;
                sink.write_f32(pose.rotation.x)?;
                sink.write_f32(pose.rotation.y)?;
                sink.write_f32(pose.rotation.z)?;
                sink.write_f32(pose.rotation.w)?;
                sink.write_f32(pose.scale.x)?;
                sink.write_f32(pose.scale.y)?;
                sink.write_f32(pose.scale.z)?;
            }
        }
    }
    Ok(())
}
