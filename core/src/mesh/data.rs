//! Decoded mesh data containers.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`PrimitiveCluster`] - Decoded vertex buffers shared by primitives
//!   with an identical attribute signature
//! - [`DecodedPrimitive`] - Per-primitive topology, index list, and
//!   material reference into its owning cluster

use std::sync::Arc;

use super::layout::VertexLayout;
use super::morph::MorphTargetBuffer;

/// Primitive topology describing how vertices are assembled into primitives.
///
/// Only the topologies the importer emits are represented; glTF strip, fan,
/// loop, and line-list modes are coerced during import (with a warning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three indices form a triangle.
    #[default]
    TriangleList,
}

/// Decoded vertex data shared by all primitives with one attribute signature.
///
/// Vertex bytes are split across the buffers described by the layout: buffer
/// 0 is the interleaved main stream (position, optionally normal/tangent);
/// further buffers hold packed texture coordinate sets, RGBA float colors,
/// and bone data. All buffers are sized `vertex_count * stride`.
///
/// The cluster owns its data for the duration of one import result; callers
/// copy or upload what they need and drop the result.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveCluster {
    layout: Option<Arc<VertexLayout>>,
    vertex_buffers: Vec<Vec<u8>>,
    vertex_count: u32,
    needs_normals: bool,
    needs_tangents: bool,
    morph_targets: Vec<MorphTargetBuffer>,
    failed: bool,
}

impl PrimitiveCluster {
    /// Create a new cluster with the given layout and vertex count.
    ///
    /// Vertex buffers start empty and are filled in via
    /// [`with_vertex_data`](Self::with_vertex_data).
    pub fn new(layout: Arc<VertexLayout>, vertex_count: u32) -> Self {
        let buffer_count = layout.buffer_count();
        Self {
            layout: Some(layout),
            vertex_buffers: vec![Vec::new(); buffer_count],
            vertex_count,
            needs_normals: false,
            needs_tangents: false,
            morph_targets: Vec::new(),
            failed: false,
        }
    }

    /// A cluster whose decode failed; carries no data.
    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    /// Set raw vertex data for a buffer slot.
    #[must_use]
    pub fn with_vertex_data(mut self, buffer_index: usize, data: Vec<u8>) -> Self {
        if buffer_index < self.vertex_buffers.len() {
            self.vertex_buffers[buffer_index] = data;
        }
        self
    }

    /// Flag that normals were absent but required and must be generated.
    #[must_use]
    pub fn with_needs_normals(mut self, needs: bool) -> Self {
        self.needs_normals = needs;
        self
    }

    /// Flag that tangents were absent but required and must be generated.
    #[must_use]
    pub fn with_needs_tangents(mut self, needs: bool) -> Self {
        self.needs_tangents = needs;
        self
    }

    /// Attach decoded morph targets.
    #[must_use]
    pub fn with_morph_targets(mut self, targets: Vec<MorphTargetBuffer>) -> Self {
        self.morph_targets = targets;
        self
    }

    /// The vertex layout, if the cluster decoded successfully.
    pub fn layout(&self) -> Option<&Arc<VertexLayout>> {
        self.layout.as_ref()
    }

    /// Raw vertex data for a buffer slot.
    pub fn vertex_buffer_data(&self, buffer_index: usize) -> Option<&[u8]> {
        self.vertex_buffers.get(buffer_index).map(|v| v.as_slice())
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Whether normals must be generated from topology by the consumer.
    pub fn needs_normals(&self) -> bool {
        self.needs_normals
    }

    /// Whether tangents must be generated from UVs and normals by the consumer.
    pub fn needs_tangents(&self) -> bool {
        self.needs_tangents
    }

    /// Decoded morph targets, in glTF target order.
    pub fn morph_targets(&self) -> &[MorphTargetBuffer] {
        &self.morph_targets
    }

    /// Whether decoding this cluster failed. Failed clusters carry no data.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Number of vertex buffers.
    pub fn buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }
}

/// One decoded mesh primitive.
///
/// References its vertex data by cluster index into the import result.
/// Indices are always widened to `i32`; `None` means the consumer should
/// draw the cluster's vertices sequentially (the importer synthesizes
/// indices whenever a topology requires reordering, so `None` only occurs
/// for primitives that failed to decode).
#[derive(Debug, Clone)]
pub struct DecodedPrimitive {
    /// Index of the owning [`PrimitiveCluster`] in the import result.
    pub cluster: usize,
    /// Output topology after draw-mode coercion.
    pub topology: PrimitiveTopology,
    /// Decoded or synthesized index list.
    pub indices: Option<Vec<i32>>,
    /// glTF material index, if the primitive has one.
    pub material: Option<usize>,
    /// Whether this primitive's decode failed (its data is absent).
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::layout::VertexLayout;

    #[test]
    fn test_cluster_basic() {
        let layout = VertexLayout::position_only();
        let cluster = PrimitiveCluster::new(layout, 3).with_vertex_data(0, vec![0u8; 36]);

        assert_eq!(cluster.vertex_count(), 3);
        assert_eq!(cluster.buffer_count(), 1);
        assert_eq!(cluster.vertex_buffer_data(0).unwrap().len(), 36);
        assert!(!cluster.is_failed());
        assert!(!cluster.needs_normals());
    }

    #[test]
    fn test_cluster_out_of_range_buffer_ignored() {
        let layout = VertexLayout::position_only();
        let cluster = PrimitiveCluster::new(layout, 1).with_vertex_data(5, vec![1, 2, 3]);
        assert!(cluster.vertex_buffer_data(5).is_none());
    }

    #[test]
    fn test_failed_cluster_is_empty() {
        let cluster = PrimitiveCluster::failed();
        assert!(cluster.is_failed());
        assert_eq!(cluster.vertex_count(), 0);
        assert_eq!(cluster.buffer_count(), 0);
        assert!(cluster.layout().is_none());
    }

    #[test]
    fn test_topology_default() {
        assert_eq!(PrimitiveTopology::default(), PrimitiveTopology::TriangleList);
    }
}
