//! Morph target (blend shape) delta storage.

/// Decoded per-vertex deltas for one morph target.
///
/// Position deltas are always present; normal and tangent deltas only when
/// the source target carries them. All arrays have the owning cluster's
/// vertex count. Deltas are already converted to the engine's left-handed
/// space (X negated).
#[derive(Debug, Clone)]
pub struct MorphTargetBuffer {
    name: String,
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    tangents: Option<Vec<[f32; 3]>>,
}

impl MorphTargetBuffer {
    /// Create a morph target buffer.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        tangents: Option<Vec<[f32; 3]>>,
    ) -> Self {
        Self {
            name: name.into(),
            positions,
            normals,
            tangents,
        }
    }

    /// Target name: from the mesh's `extras.targetNames` list, or the
    /// ordinal index as a string when unnamed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position deltas, one per vertex.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Normal deltas, if the target provides them.
    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    /// Tangent deltas, if the target provides them.
    pub fn tangents(&self) -> Option<&[[f32; 3]]> {
        self.tangents.as_deref()
    }
}
