use std::hash::{Hash, Hasher};

/// Maximum joint influences carried by a source vertex.
pub const MAX_INFLUENCES: usize = 4;

/// One fully-resolved render vertex.
///
/// Identity is exact field-wise equality, floating-point fields included;
/// no tolerance is applied. Two vertices that differ in the last mantissa
/// bit are distinct entries. This matches the assets already in the wild,
/// so it must stay the default even though near-duplicate geometry from
/// float noise will not merge.
///
/// `joint_indices` / `joint_weights` are parallel; before subskeleton
/// partitioning they hold up to [`MAX_INFLUENCES`] entries (weights empty
/// when the source weights summed to zero), afterwards exactly one slot
/// per bone-group member with `-1` / `0.0` for unused slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub joint_indices: Vec<i32>,
    pub joint_weights: Vec<f32>,
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in self.position {
            hash_f32(v, state);
        }
        for v in self.uv {
            hash_f32(v, state);
        }
        for v in self.normal {
            hash_f32(v, state);
        }
        for v in self.color {
            hash_f32(v, state);
        }
        self.joint_indices.hash(state);
        self.joint_weights.len().hash(state);
        for &v in &self.joint_weights {
            hash_f32(v, state);
        }
    }
}

/// Hash an f32 by bit pattern; `-0.0` is folded onto `+0.0` so that keys
/// comparing equal under `==` hash equally.
fn hash_f32<H: Hasher>(v: f32, state: &mut H) {
    (v + 0.0).to_bits().hash(state);
}

/// Normalize joint weights so they sum to 1. A zero total yields an empty
/// list; the encoders pad missing slots with zero weights.
pub fn normalized_weights(weights: &[f32]) -> Vec<f32> {
    let total: f32 = weights.iter().sum();
    if total == 0.0 {
        Vec::new()
    } else {
        weights.iter().map(|w| w / total).collect()
    }
}
