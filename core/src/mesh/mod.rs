//! CPU-side mesh data structures for decoded glTF geometry.
//!
//! This module provides:
//!
//! - [`VertexLayout`] - Describes vertex attributes across multiple buffers
//! - [`PrimitiveCluster`] - Decoded vertex data shared by primitives with
//!   identical attribute signatures
//! - [`DecodedPrimitive`] - Per-primitive topology, indices, and material
//! - [`MorphTargetBuffer`] - Per-target blend shape deltas

mod data;
mod layout;
mod morph;

pub use data::{DecodedPrimitive, PrimitiveCluster, PrimitiveTopology};
pub use layout::{
    find_or_create_layout, VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic,
    VertexBufferLayout, VertexLayout,
};
pub use morph::MorphTargetBuffer;
