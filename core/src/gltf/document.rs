//! Document model: the parsed glTF JSON plus resolved buffer data.
//!
//! The [`Document`] owns the buffer table for the lifetime of one import.
//! Buffer slots fill from three sources: the GLB binary chunk, inline
//! `data:` URIs, and bytes injected by the external download collaborator.
//! On top of that it resolves accessor → bufferView → buffer chains into
//! bounds-checked byte slices, and assigns [`AccessorUsage`] tags with
//! consistency checks.

use std::collections::HashSet;

use super::accessor::{ComponentType, DenseSource, ElementType, ResolvedAccessor, SparseSource};
use super::error::GltfError;
use super::json;
use super::report::{codes, ImportReport};

/// Extensions this importer knows how to handle (or safely pass through).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "KHR_draco_mesh_compression",
    "KHR_texture_basisu",
    "EXT_meshopt_compression",
    "KHR_materials_pbrSpecularGlossiness",
    "KHR_materials_unlit",
    "KHR_texture_transform",
    "KHR_mesh_quantization",
    "KHR_materials_transmission",
    "EXT_mesh_gpu_instancing",
    "KHR_lights_punctual",
];

/// How an accessor's decoded data is consumed.
///
/// One accessor must not serve two incompatible usages; the assignment pass
/// flags conflicts as content warnings without blocking the import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorUsage {
    /// Index list, as stored.
    Index,
    /// Index list with per-triangle winding flip.
    IndexFlipped,
    /// Vertex or morph-delta positions.
    Position,
    /// Vertex or morph-delta normals.
    Normal,
    /// Vertex or morph-delta tangents.
    Tangent,
    /// Vertex colors.
    Color,
    /// Texture coordinates.
    TexCoord,
    /// Joint indices.
    Joints,
    /// Joint weights.
    Weights,
    /// Skin inverse bind matrices.
    InverseBindMatrix,
    /// Animated translation values.
    Translation,
    /// Animated rotation values.
    Rotation,
    /// Animated scale values.
    Scale,
    /// Animated morph target weights.
    Weight,
    /// Animation keyframe times.
    AnimationTimes,
    /// Recognized but not consumed by this importer.
    Ignore,
}

/// Resolved accessor metadata, exposed alongside raw data.
#[derive(Debug, Clone, Copy)]
pub struct AccessorInfo {
    /// Accessor index in the document.
    pub index: usize,
    /// Source component type.
    pub component_type: ComponentType,
    /// Element shape.
    pub element_type: ElementType,
    /// Number of elements.
    pub count: usize,
    /// Whether integer components map to [0,1] / [-1,1].
    pub normalized: bool,
    /// Backing bufferView, absent for pure-sparse or compressed
    /// placeholder accessors.
    pub buffer_view: Option<usize>,
    /// Byte offset into the bufferView.
    pub byte_offset: usize,
    /// Whether a sparse override is present.
    pub has_sparse: bool,
}

impl AccessorInfo {
    /// Bytes of one tightly packed element.
    pub fn element_size(&self) -> usize {
        self.component_type.byte_size() * self.element_type.component_count()
    }
}

/// In-memory glTF document with its buffer table.
pub struct Document {
    root: json::Root,
    buffers: Vec<Option<Vec<u8>>>,
}

impl Document {
    /// Parses glTF JSON text.
    pub fn from_json_text(text: &str) -> Result<Self, GltfError> {
        let root: json::Root = serde_json::from_str(text)?;
        let buffer_count = root.buffers.len();
        Ok(Self {
            root,
            buffers: vec![None; buffer_count],
        })
    }

    /// The parsed JSON document.
    pub fn root(&self) -> &json::Root {
        &self.root
    }

    /// Accessor descriptions.
    pub fn accessors(&self) -> &[json::Accessor] {
        &self.root.accessors
    }

    /// Mesh descriptions.
    pub fn meshes(&self) -> &[json::Mesh] {
        &self.root.meshes
    }

    /// Material metadata for the external material collaborator.
    pub fn materials(&self) -> &[json::Material] {
        &self.root.materials
    }

    /// Node descriptions.
    pub fn nodes(&self) -> &[json::Node] {
        &self.root.nodes
    }

    /// Scene descriptions.
    pub fn scenes(&self) -> &[json::SceneDef] {
        &self.root.scenes
    }

    /// Skin descriptions.
    pub fn skins(&self) -> &[json::Skin] {
        &self.root.skins
    }

    /// Animation descriptions.
    pub fn animations(&self) -> &[json::Animation] {
        &self.root.animations
    }

    /// Image references for the external texture collaborator.
    pub fn images(&self) -> &[json::Image] {
        &self.root.images
    }

    /// Texture references for the external texture collaborator.
    pub fn textures(&self) -> &[json::Texture] {
        &self.root.textures
    }

    /// Sampler parameters for the external texture collaborator.
    pub fn samplers(&self) -> &[json::Sampler] {
        &self.root.samplers
    }

    /// Checks extension lists against the supported set.
    ///
    /// An unsupported required extension aborts the import; an unsupported
    /// used extension is only a warning.
    pub fn check_extensions(&self, report: &mut ImportReport) -> Result<(), GltfError> {
        for name in &self.root.extensions_required {
            if !SUPPORTED_EXTENSIONS.contains(&name.as_str()) {
                report.error(
                    codes::EXTENSION_UNSUPPORTED,
                    format!("required extension '{name}' is not supported"),
                );
                return Err(GltfError::ExtensionUnsupported(name.clone()));
            }
        }
        for name in &self.root.extensions_used {
            if !SUPPORTED_EXTENSIONS.contains(&name.as_str()) {
                report.warning(
                    codes::EXTENSION_UNSUPPORTED,
                    format!("used extension '{name}' is not supported"),
                );
            }
        }
        Ok(())
    }

    /// Fills buffer slots backed by the GLB binary chunk or `data:` URIs.
    ///
    /// External URIs are left unresolved for the download collaborator; see
    /// [`unresolved_buffers`](Self::unresolved_buffers) and
    /// [`inject_buffer`](Self::inject_buffer).
    pub fn resolve_embedded_buffers(&mut self, bin_chunk: Option<&[u8]>) -> Result<(), GltfError> {
        for (i, buffer) in self.root.buffers.iter().enumerate() {
            match &buffer.uri {
                None => {
                    let bin = bin_chunk.ok_or_else(|| {
                        GltfError::BufferError(format!(
                            "buffer {i} has no URI and the container has no BIN chunk"
                        ))
                    })?;
                    if bin.len() < buffer.byte_length {
                        return Err(GltfError::BufferError(format!(
                            "buffer {i} declares {} bytes but the BIN chunk has {}",
                            buffer.byte_length,
                            bin.len()
                        )));
                    }
                    self.buffers[i] = Some(bin.to_vec());
                }
                Some(uri) if uri.starts_with("data:") => {
                    let data = parse_data_uri(uri).ok_or_else(|| {
                        GltfError::EmbedBufferLoadFailed(format!(
                            "buffer {i} has a malformed data URI"
                        ))
                    })?;
                    if data.len() < buffer.byte_length {
                        return Err(GltfError::EmbedBufferLoadFailed(format!(
                            "buffer {i} declares {} bytes but its data URI decodes to {}",
                            buffer.byte_length,
                            data.len()
                        )));
                    }
                    self.buffers[i] = Some(data);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Buffer slots still waiting for externally fetched bytes.
    pub fn unresolved_buffers(&self) -> Vec<(usize, String)> {
        self.root
            .buffers
            .iter()
            .enumerate()
            .filter(|(i, _)| self.buffers[*i].is_none())
            .filter_map(|(i, b)| b.uri.as_ref().map(|uri| (i, uri.clone())))
            .collect()
    }

    /// Injects externally downloaded bytes into a buffer slot.
    pub fn inject_buffer(&mut self, index: usize, data: Vec<u8>) -> Result<(), GltfError> {
        let buffer = self
            .root
            .buffers
            .get(index)
            .ok_or_else(|| GltfError::BufferError(format!("buffer index {index} out of range")))?;
        if data.len() < buffer.byte_length {
            return Err(GltfError::BufferError(format!(
                "buffer {index} declares {} bytes but received {}",
                buffer.byte_length,
                data.len()
            )));
        }
        self.buffers[index] = Some(data);
        Ok(())
    }

    /// Resolved bytes of a buffer.
    pub fn buffer_data(&self, index: usize) -> Result<&[u8], GltfError> {
        self.buffers
            .get(index)
            .ok_or_else(|| GltfError::BufferError(format!("buffer index {index} out of range")))?
            .as_deref()
            .ok_or_else(|| GltfError::BufferError(format!("buffer {index} is not resolved")))
    }

    /// Bounds-checked slice of `byte_length` bytes at `extra_offset` into a
    /// bufferView.
    pub fn buffer_view_slice(
        &self,
        view_index: usize,
        extra_offset: usize,
        byte_length: usize,
    ) -> Result<&[u8], GltfError> {
        let view = self.root.buffer_views.get(view_index).ok_or_else(|| {
            GltfError::BufferError(format!("bufferView index {view_index} out of range"))
        })?;
        let data = self.buffer_data(view.buffer)?;
        let start = view
            .byte_offset
            .checked_add(extra_offset)
            .ok_or_else(|| GltfError::BufferError("bufferView offset overflow".into()))?;
        let end = start
            .checked_add(byte_length)
            .ok_or_else(|| GltfError::BufferError("bufferView length overflow".into()))?;
        if byte_length > view.byte_length
            || extra_offset > view.byte_length - byte_length
            || end > data.len()
        {
            return Err(GltfError::BufferError(format!(
                "bufferView {view_index} slice [{start}..{end}] out of bounds"
            )));
        }
        Ok(&data[start..end])
    }

    /// Resolved metadata of an accessor.
    pub fn accessor_info(&self, index: usize) -> Result<AccessorInfo, GltfError> {
        let accessor = self.root.accessors.get(index).ok_or_else(|| {
            GltfError::AccessorError(format!("accessor index {index} out of range"))
        })?;
        let component_type = ComponentType::from_gltf(accessor.component_type).ok_or_else(|| {
            GltfError::AccessorError(format!(
                "accessor {index} has unknown component type {}",
                accessor.component_type
            ))
        })?;
        let element_type = ElementType::from_gltf(&accessor.element_type).ok_or_else(|| {
            GltfError::AccessorError(format!(
                "accessor {index} has unknown element type '{}'",
                accessor.element_type
            ))
        })?;
        Ok(AccessorInfo {
            index,
            component_type,
            element_type,
            count: accessor.count,
            normalized: accessor.normalized,
            buffer_view: accessor.buffer_view,
            byte_offset: accessor.byte_offset,
            has_sparse: accessor.sparse.is_some(),
        })
    }

    /// Metadata, raw bytes, and effective stride of an accessor's dense
    /// storage.
    ///
    /// This is the surface instantiation and material code uses to pull
    /// accessor data directly. Fails for accessors without a bufferView.
    pub fn accessor_data(&self, index: usize) -> Result<(AccessorInfo, &[u8], usize), GltfError> {
        let info = self.accessor_info(index)?;
        let view_index = info.buffer_view.ok_or_else(|| {
            GltfError::AccessorError(format!("accessor {index} has no bufferView"))
        })?;
        let (bytes, stride) = self.dense_slice(&info, view_index)?;
        Ok((info, bytes, stride))
    }

    fn dense_slice(
        &self,
        info: &AccessorInfo,
        view_index: usize,
    ) -> Result<(&[u8], usize), GltfError> {
        let view = self.root.buffer_views.get(view_index).ok_or_else(|| {
            GltfError::BufferError(format!("bufferView index {view_index} out of range"))
        })?;
        let elem_size = info.element_size();
        // A zero/absent byteStride means tightly packed.
        let stride = match view.byte_stride {
            Some(0) | None => elem_size,
            Some(stride) => stride,
        };
        if stride < elem_size {
            return Err(GltfError::AccessorError(format!(
                "accessor {} stride {stride} smaller than element size {elem_size}",
                info.index
            )));
        }
        let needed = if info.count == 0 {
            0
        } else {
            (info.count - 1) * stride + elem_size
        };
        let bytes = self.buffer_view_slice(view_index, info.byte_offset, needed)?;
        Ok((bytes, stride))
    }

    /// Resolves an accessor's metadata and data slices for decoding.
    pub(crate) fn resolve_accessor(&self, index: usize) -> Result<ResolvedAccessor<'_>, String> {
        let info = self.accessor_info(index).map_err(|e| e.to_string())?;
        let dense = match info.buffer_view {
            Some(view_index) => {
                let (bytes, stride) = self
                    .dense_slice(&info, view_index)
                    .map_err(|e| e.to_string())?;
                Some(DenseSource { bytes, stride })
            }
            None => None,
        };

        let accessor = &self.root.accessors[index];
        let sparse = match &accessor.sparse {
            Some(sparse) => {
                let index_type =
                    ComponentType::from_gltf(sparse.indices.component_type).ok_or_else(|| {
                        format!(
                            "accessor {index} sparse indices have unknown component type {}",
                            sparse.indices.component_type
                        )
                    })?;
                let indices = self
                    .buffer_view_slice(
                        sparse.indices.buffer_view,
                        sparse.indices.byte_offset,
                        sparse.count * index_type.byte_size(),
                    )
                    .map_err(|e| e.to_string())?;
                let values = self
                    .buffer_view_slice(
                        sparse.values.buffer_view,
                        sparse.values.byte_offset,
                        sparse.count * info.element_size(),
                    )
                    .map_err(|e| e.to_string())?;
                Some(SparseSource {
                    count: sparse.count,
                    index_type,
                    indices,
                    values,
                })
            }
            None => None,
        };

        Ok(ResolvedAccessor {
            component_type: info.component_type,
            element_type: info.element_type,
            count: info.count,
            normalized: info.normalized,
            dense,
            sparse,
        })
    }

    /// Assigns a usage tag to every referenced accessor.
    ///
    /// Conflicting reuse is a content warning, never an error; the first
    /// assigned usage wins. An accessor shared across meshes is flagged as
    /// a performance warning.
    pub fn assign_usages(&self, report: &mut ImportReport) -> Vec<Option<AccessorUsage>> {
        let mut usages: Vec<Option<AccessorUsage>> = vec![None; self.root.accessors.len()];
        let mut owner_mesh: Vec<Option<usize>> = vec![None; self.root.accessors.len()];
        let mut shared_reported: HashSet<usize> = HashSet::new();

        for (mesh_index, mesh) in self.root.meshes.iter().enumerate() {
            for primitive in &mesh.primitives {
                if let Some(indices) = primitive.indices {
                    // Geometry is X-mirrored, so explicit indices always
                    // take the winding-flipped usage.
                    self.merge_usage(&mut usages, report, indices, AccessorUsage::IndexFlipped);
                }
                for (semantic, &accessor) in &primitive.attributes {
                    self.merge_usage(&mut usages, report, accessor, semantic_usage(semantic));
                    self.track_mesh_sharing(
                        &mut owner_mesh,
                        &mut shared_reported,
                        report,
                        accessor,
                        mesh_index,
                    );
                }
                for target in &primitive.targets {
                    for (semantic, &accessor) in target {
                        self.merge_usage(&mut usages, report, accessor, semantic_usage(semantic));
                        self.track_mesh_sharing(
                            &mut owner_mesh,
                            &mut shared_reported,
                            report,
                            accessor,
                            mesh_index,
                        );
                    }
                }
            }
        }

        for skin in &self.root.skins {
            if let Some(ibm) = skin.inverse_bind_matrices {
                self.merge_usage(&mut usages, report, ibm, AccessorUsage::InverseBindMatrix);
            }
        }

        for animation in &self.root.animations {
            for channel in &animation.channels {
                let Some(sampler) = animation.samplers.get(channel.sampler) else {
                    continue;
                };
                self.merge_usage(&mut usages, report, sampler.input, AccessorUsage::AnimationTimes);
                let usage = match channel.target.path.as_str() {
                    "translation" => AccessorUsage::Translation,
                    "rotation" => AccessorUsage::Rotation,
                    "scale" => AccessorUsage::Scale,
                    "weights" => AccessorUsage::Weight,
                    _ => AccessorUsage::Ignore,
                };
                self.merge_usage(&mut usages, report, sampler.output, usage);
            }
        }

        usages
    }

    fn merge_usage(
        &self,
        usages: &mut [Option<AccessorUsage>],
        report: &mut ImportReport,
        index: usize,
        usage: AccessorUsage,
    ) {
        let Some(slot) = usages.get_mut(index) else {
            report.warning(
                codes::USAGE_CONFLICT,
                format!("accessor index {index} out of range"),
            );
            return;
        };
        match slot {
            None => *slot = Some(usage),
            Some(existing) if *existing != usage => {
                report.warning(
                    codes::USAGE_CONFLICT,
                    format!(
                        "accessor {index} reused as {usage:?} but already assigned {existing:?}"
                    ),
                );
            }
            Some(_) => {}
        }
    }

    fn track_mesh_sharing(
        &self,
        owner_mesh: &mut [Option<usize>],
        shared_reported: &mut HashSet<usize>,
        report: &mut ImportReport,
        accessor: usize,
        mesh_index: usize,
    ) {
        let Some(owner) = owner_mesh.get_mut(accessor) else {
            return;
        };
        match owner {
            None => *owner = Some(mesh_index),
            Some(existing) if *existing != mesh_index => {
                if shared_reported.insert(accessor) {
                    report.warning(
                        codes::ACCESSOR_SHARED,
                        format!(
                            "accessor {accessor} is shared by meshes {existing} and {mesh_index}"
                        ),
                    );
                }
            }
            Some(_) => {}
        }
    }
}

fn semantic_usage(semantic: &str) -> AccessorUsage {
    match semantic {
        "POSITION" => AccessorUsage::Position,
        "NORMAL" => AccessorUsage::Normal,
        "TANGENT" => AccessorUsage::Tangent,
        s if s.starts_with("COLOR_") => AccessorUsage::Color,
        s if s.starts_with("TEXCOORD_") => AccessorUsage::TexCoord,
        s if s.starts_with("JOINTS_") => AccessorUsage::Joints,
        s if s.starts_with("WEIGHTS_") => AccessorUsage::Weights,
        _ => AccessorUsage::Ignore,
    }
}

/// Decodes a `data:<mime>;base64,<payload>` URI.
fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let base64_start = rest.find(";base64,")?;
    let encoded = &rest[base64_start + 8..];
    base64_decode(encoded)
}

/// Simple base64 decoder (avoids adding a dependency).
fn base64_decode(input: &str) -> Option<Vec<u8>> {
    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    fn decode_char(c: u8) -> Option<u8> {
        TABLE.iter().position(|&b| b == c).map(|p| p as u8)
    }

    let input: Vec<u8> = input
        .bytes()
        .filter(|&b| b != b'\n' && b != b'\r' && b != b' ')
        .collect();
    let mut result = Vec::with_capacity(input.len() * 3 / 4);

    for chunk in input.chunks(4) {
        let mut buf = [0u8; 4];
        let mut pad = 0;

        for (i, &byte) in chunk.iter().enumerate() {
            if byte == b'=' {
                pad += 1;
                buf[i] = 0;
            } else {
                buf[i] = decode_char(byte)?;
            }
        }

        result.push((buf[0] << 2) | (buf[1] >> 4));
        if pad < 2 {
            result.push((buf[1] << 4) | (buf[2] >> 2));
        }
        if pad < 1 {
            result.push((buf[2] << 6) | buf[3]);
        }
    }

    Some(result)
}
