use std::collections::HashMap;

use crate::types::Vertex;

/// One draw bucket: unique vertices plus triangle indices into them.
///
/// Buckets are keyed by material before partitioning and by
/// (material, subskeleton) afterwards; `-1` marks an unset key. Vertex and
/// index growth is monotonic, entries are never removed, and insertion
/// order is output order.
#[derive(Debug, Clone, Default)]
pub struct MeshBucket {
    pub material_index: i32,
    pub subskeleton_index: i32,
    vertices: Vec<Vertex>,
    lookup: HashMap<Vertex, u32>,
    indices: Vec<u32>,
    /// Running sum into the global vertex buffer, set by
    /// `ProcyonData::finalize_offsets`.
    pub vertex_offset: u32,
    /// Running sum into the global index buffer.
    pub index_offset: u32,
}

impl MeshBucket {
    pub fn new(material_index: i32, subskeleton_index: i32) -> Self {
        Self {
            material_index,
            subskeleton_index,
            ..Default::default()
        }
    }

    /// Insert a vertex, deduplicating by exact equality.
    ///
    /// The first insertion of a value allocates the next sequential local
    /// index; an equal vertex returns the existing index.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> u32 {
        if let Some(&index) = self.lookup.get(&vertex) {
            return index;
        }
        let index = self.vertices.len() as u32;
        self.lookup.insert(vertex.clone(), index);
        self.vertices.push(vertex);
        index
    }

    /// Append one corner index in source face-loop order.
    pub fn push_index(&mut self, index: u32) {
        self.indices.push(index);
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// The three corner indices of triangle `t`.
    pub fn triangle(&self, t: usize) -> [u32; 3] {
        [
            self.indices[3 * t],
            self.indices[3 * t + 1],
            self.indices[3 * t + 2],
        ]
    }
}
