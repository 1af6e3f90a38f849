//! Serde schema for the glTF 2.0 JSON document.
//!
//! Mirrors the glTF field names (camelCase) onto snake-case Rust fields.
//! The schema is parse-only: geometry-relevant parts are decoded by the
//! importer, while materials, images, textures, and samplers are kept as
//! metadata for external collaborators. Extension payloads stay as raw
//! [`serde_json::Value`]s.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Top-level glTF document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    /// Asset metadata (version, generator).
    #[serde(default)]
    pub asset: Asset,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub scenes: Vec<SceneDef>,
    /// Default scene index.
    pub scene: Option<usize>,
    #[serde(default)]
    pub skins: Vec<Skin>,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub textures: Vec<Texture>,
    #[serde(default)]
    pub samplers: Vec<Sampler>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions_required: Vec<String>,
    pub extensions: Option<Value>,
}

/// `asset` object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub version: String,
    pub generator: Option<String>,
    pub min_version: Option<String>,
}

/// Raw byte buffer description.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    /// External or data URI; absent for the GLB binary chunk.
    pub uri: Option<String>,
    pub byte_length: usize,
    pub name: Option<String>,
}

/// Byte-range window into a buffer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Bytes between elements for interleaved data; absent means tightly
    /// packed.
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
    pub name: Option<String>,
}

/// Typed view over bufferView data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    /// glTF component type constant (5120..5126).
    pub component_type: u32,
    /// Element shape: SCALAR, VEC2..VEC4, MAT2..MAT4.
    #[serde(rename = "type")]
    pub element_type: String,
    pub count: usize,
    #[serde(default)]
    pub normalized: bool,
    pub sparse: Option<AccessorSparse>,
    pub name: Option<String>,
}

/// Sparse override of a dense accessor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorSparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

/// Where the sparse patch indices live.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
}

/// Where the sparse patch values live.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
}

/// A mesh: a list of primitives plus optional morph target metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
    /// Default morph target weights.
    #[serde(default)]
    pub weights: Vec<f32>,
    pub name: Option<String>,
    /// Carries `targetNames` for morph targets, among other things.
    pub extras: Option<Value>,
}

/// One drawable primitive of a mesh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    /// Attribute semantic name → accessor index. A `BTreeMap` so primitives
    /// with the same attributes compare and hash identically.
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    /// Draw mode; defaults to triangles.
    #[serde(default = "default_mode")]
    pub mode: u32,
    /// Morph target attribute maps.
    #[serde(default)]
    pub targets: Vec<BTreeMap<String, usize>>,
    pub extensions: Option<Value>,
}

fn default_mode() -> u32 {
    4
}

/// Material metadata, kept for external material construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughness>,
    pub normal_texture: Option<NormalTextureInfo>,
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    #[serde(default)]
    pub emissive_factor: [f32; 3],
    #[serde(default = "default_alpha_mode")]
    pub alpha_mode: String,
    #[serde(default = "default_alpha_cutoff")]
    pub alpha_cutoff: f32,
    #[serde(default)]
    pub double_sided: bool,
    /// Unlit, specular-glossiness, transmission, texture-transform payloads.
    pub extensions: Option<Value>,
    pub extras: Option<Value>,
}

fn default_alpha_mode() -> String {
    "OPAQUE".into()
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

/// `pbrMetallicRoughness` material block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default = "default_base_color")]
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureInfo>,
    #[serde(default = "default_factor_one")]
    pub metallic_factor: f32,
    #[serde(default = "default_factor_one")]
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
}

fn default_base_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn default_factor_one() -> f32 {
    1.0
}

/// Reference from a material to a texture.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    /// `KHR_texture_transform` payload, if present.
    pub extensions: Option<Value>,
}

/// Normal map reference with scale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    #[serde(default = "default_factor_one")]
    pub scale: f32,
}

/// Occlusion map reference with strength.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: u32,
    #[serde(default = "default_factor_one")]
    pub strength: f32,
}

/// A scene-graph node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: Option<String>,
    pub camera: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
    pub skin: Option<usize>,
    /// Column-major local transform; exclusive with translation/rotation/scale.
    pub matrix: Option<[f32; 16]>,
    pub mesh: Option<usize>,
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    pub translation: Option<[f32; 3]>,
    #[serde(default)]
    pub weights: Vec<f32>,
    /// `EXT_mesh_gpu_instancing` and friends.
    pub extensions: Option<Value>,
}

/// A scene: a set of root node indices.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDef {
    #[serde(default)]
    pub nodes: Vec<usize>,
    pub name: Option<String>,
}

/// A skin for skeletal animation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
    pub joints: Vec<usize>,
    pub name: Option<String>,
}

/// A keyframe animation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub channels: Vec<AnimationChannelDef>,
    pub samplers: Vec<AnimationSamplerDef>,
    pub name: Option<String>,
}

/// Binds an animation sampler to a node property.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationChannelDef {
    pub sampler: usize,
    pub target: AnimationTarget,
}

/// The node and property an animation channel drives.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationTarget {
    pub node: Option<usize>,
    /// "translation", "rotation", "scale", or "weights".
    pub path: String,
}

/// Keyframe input/output accessor pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSamplerDef {
    pub input: usize,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
    pub output: usize,
}

fn default_interpolation() -> String {
    "LINEAR".into()
}

/// An image reference (decoding is the caller's concern).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
    pub name: Option<String>,
}

/// A texture: image source plus sampler.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    pub name: Option<String>,
    /// `KHR_texture_basisu` payload, if present.
    pub extensions: Option<Value>,
}

/// Texture sampling parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    #[serde(default = "default_wrap")]
    pub wrap_s: u32,
    #[serde(default = "default_wrap")]
    pub wrap_t: u32,
    pub name: Option<String>,
}

fn default_wrap() -> u32 {
    10497
}
