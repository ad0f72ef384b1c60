//! Forward/up axis mapping.
//!
//! Source assets use the -Z forward, +Y up convention; `--forward` and
//! `--up` pick the basis the exported asset should use instead.

use glam::{Mat3, Vec3};

use crate::config::Axis;
use crate::error::{ProcyonError, Result};

/// Rotation that maps the source convention (-Z forward, +Y up) onto the
/// requested target axes. Identity for the default -Z/+Y pair.
pub fn conversion_matrix(forward: Axis, up: Axis) -> Result<Mat3> {
    let target_forward = forward.vector();
    let target_up = up.vector();

    if target_forward.cross(target_up).length_squared() < f32::EPSILON {
        return Err(ProcyonError::Input(format!(
            "forward axis {forward} and up axis {up} are colinear"
        )));
    }

    let source = basis(Vec3::NEG_Z, Vec3::Y);
    let target = basis(target_forward, target_up);

    // Both bases are orthonormal, so the source inverse is its transpose.
    Ok(target * source.transpose())
}

/// Right-handed basis with the given forward and up as columns
/// (right, up, forward).
fn basis(forward: Vec3, up: Vec3) -> Mat3 {
    Mat3::from_cols(forward.cross(up), up, forward)
}
