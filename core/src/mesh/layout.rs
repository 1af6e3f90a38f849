//! Vertex layout descriptions.
//!
//! A [`VertexLayout`] describes how decoded attributes are arranged across
//! one or more vertex buffers: the main interleaved stream (position,
//! optionally normal and tangent) plus separate packed streams for texture
//! coordinates, colors, and bone data. Layouts are shared across primitive
//! clusters via structural equality (labels are ignored).

use std::sync::Arc;

/// Meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    /// Vertex position.
    Position,
    /// Vertex normal.
    Normal,
    /// Vertex tangent (xyz + handedness w).
    Tangent,
    /// Vertex color (always RGBA float after decoding).
    Color,
    /// Texture coordinate set 0..7.
    TexCoord(u8),
    /// Joint indices (widened to u32 per channel).
    Joints,
    /// Joint weights.
    Weights,
}

/// Data format of a vertex attribute in its decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Two f32 components (8 bytes).
    Float2,
    /// Three f32 components (12 bytes).
    Float3,
    /// Four f32 components (16 bytes).
    Float4,
    /// Four u32 components (16 bytes).
    Uint4,
}

impl VertexAttributeFormat {
    /// Size of one attribute value in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 | Self::Uint4 => 16,
        }
    }
}

/// One attribute within a [`VertexLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// What the attribute means.
    pub semantic: VertexAttributeSemantic,
    /// How the attribute is stored.
    pub format: VertexAttributeFormat,
    /// Byte offset within one vertex of the owning buffer.
    pub offset: u32,
    /// Which buffer of the layout holds this attribute.
    pub buffer_index: usize,
}

impl VertexAttribute {
    /// Create a new attribute.
    pub fn new(
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
        offset: u32,
        buffer_index: usize,
    ) -> Self {
        Self {
            semantic,
            format,
            offset,
            buffer_index,
        }
    }

    /// Position attribute (Float3) in buffer 0.
    pub fn position(offset: u32) -> Self {
        Self::new(
            VertexAttributeSemantic::Position,
            VertexAttributeFormat::Float3,
            offset,
            0,
        )
    }

    /// Normal attribute (Float3) in buffer 0.
    pub fn normal(offset: u32) -> Self {
        Self::new(
            VertexAttributeSemantic::Normal,
            VertexAttributeFormat::Float3,
            offset,
            0,
        )
    }

    /// Tangent attribute (Float4) in buffer 0.
    pub fn tangent(offset: u32) -> Self {
        Self::new(
            VertexAttributeSemantic::Tangent,
            VertexAttributeFormat::Float4,
            offset,
            0,
        )
    }
}

/// Per-buffer stride description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferLayout {
    /// Bytes between consecutive vertices in this buffer.
    pub stride: u32,
}

impl VertexBufferLayout {
    /// Create a buffer layout with the given stride.
    pub fn new(stride: u32) -> Self {
        Self { stride }
    }
}

/// Describes the arrangement of vertex attributes across buffers.
///
/// Built with the `with_*` methods:
///
/// ```
/// use glint_core::mesh::{VertexAttribute, VertexBufferLayout, VertexLayout};
///
/// let layout = VertexLayout::new()
///     .with_buffer(VertexBufferLayout::new(24))
///     .with_attribute(VertexAttribute::position(0))
///     .with_attribute(VertexAttribute::normal(12));
/// assert_eq!(layout.buffer_stride(0), 24);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    /// Buffer descriptions, indexed by `VertexAttribute::buffer_index`.
    pub buffers: Vec<VertexBufferLayout>,
    /// All attributes across all buffers.
    pub attributes: Vec<VertexAttribute>,
    /// Optional debug label (ignored for equality).
    pub label: Option<String>,
}

impl VertexLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer description.
    #[must_use]
    pub fn with_buffer(mut self, buffer: VertexBufferLayout) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set a debug label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of vertex buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Stride of the given buffer, or 0 if out of range.
    pub fn buffer_stride(&self, buffer_index: usize) -> u32 {
        self.buffers.get(buffer_index).map_or(0, |b| b.stride)
    }

    /// Iterate over the attributes stored in the given buffer.
    pub fn attributes_for_buffer(
        &self,
        buffer_index: usize,
    ) -> impl Iterator<Item = &VertexAttribute> {
        self.attributes
            .iter()
            .filter(move |a| a.buffer_index == buffer_index)
    }

    /// Find the attribute with the given semantic, if present.
    pub fn attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    /// Layout with a single position-only interleaved buffer.
    pub fn position_only() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_buffer(VertexBufferLayout::new(12))
                .with_attribute(VertexAttribute::position(0)),
        )
    }
}

/// Check if two layouts are structurally equal (ignoring label).
///
/// Compares buffer count, strides, and all attributes (order-independent
/// for attributes).
pub(crate) fn layouts_structurally_equal(a: &VertexLayout, b: &VertexLayout) -> bool {
    if a.buffers.len() != b.buffers.len() {
        return false;
    }
    for (ab, bb) in a.buffers.iter().zip(b.buffers.iter()) {
        if ab.stride != bb.stride {
            return false;
        }
    }
    if a.attributes.len() != b.attributes.len() {
        return false;
    }
    a.attributes.iter().all(|aa| {
        b.attributes.iter().any(|ba| {
            aa.semantic == ba.semantic
                && aa.format == ba.format
                && aa.offset == ba.offset
                && aa.buffer_index == ba.buffer_index
        })
    })
}

/// Find or create a shared layout.
///
/// Searches `existing_layouts` for a structural match. If found, returns the
/// existing Arc. Otherwise, creates a new Arc and appends it to `new_layouts`.
pub fn find_or_create_layout(
    layout: VertexLayout,
    existing_layouts: &[Arc<VertexLayout>],
    new_layouts: &mut Vec<Arc<VertexLayout>>,
) -> Arc<VertexLayout> {
    for existing in existing_layouts {
        if layouts_structurally_equal(&layout, existing) {
            return Arc::clone(existing);
        }
    }
    for new_layout in new_layouts.iter() {
        if layouts_structurally_equal(&layout, new_layout) {
            return Arc::clone(new_layout);
        }
    }
    let arc = Arc::new(layout);
    new_layouts.push(Arc::clone(&arc));
    arc
}
