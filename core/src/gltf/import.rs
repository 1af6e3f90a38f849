//! The import session: phased, cooperative glTF import.
//!
//! [`import_gltf`] runs the whole pipeline: container parse, JSON parse,
//! extension check, buffer resolution (awaiting external fetches),
//! usage assignment, per-primitive job scheduling, a polled dispatch loop,
//! and output materialization. Control yields back to the host at the
//! checkpoints between phases, where the session's yield policy and
//! cancellation token are consulted; dispatched decode units always run to
//! completion.
//!
//! Fatal problems return an error. Per-primitive decode failures do not:
//! the failed primitive's data is absent and flagged, the rest of the
//! scene imports, and [`ImportResult::success`] reports the partial
//! failure. Callers must check that flag rather than rely on `Err`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::compute::{
    noop_waker, CancellationToken, Checkpoint, FetchProvider, JobScheduler, YieldPolicy, YieldTimer,
};
use crate::math;
use crate::mesh::{DecodedPrimitive, PrimitiveCluster, PrimitiveTopology, VertexLayout};
use crate::scene::{
    Animation, AnimationChannel, AnimationProperty, Interpolation, NodeTransform, Scene, SceneNode,
    SceneSkin,
};

use super::accessor::{self, FloatTarget};
use super::document::{AccessorUsage, Document};
use super::error::GltfError;
use super::glb;
use super::indices::{self, IndexResolution};
use super::json;
use super::report::{codes, ImportReport};
use super::vertex::{self, ClusterPlan, PrimitiveSignature};

/// Configuration for one import session.
///
/// The yield policy and cancellation token are injected here instead of
/// living in process-wide state, so tests can run with a deterministic
/// policy.
#[derive(Clone)]
pub struct ImportSettings {
    /// When checkpoints actually suspend back to the host.
    pub yield_policy: YieldPolicy,
    /// Cooperative cancellation, checked at checkpoints only.
    pub cancellation: Option<CancellationToken>,
    /// Bone influences used by the consuming skinning path (1..=4). Below
    /// 4, each vertex's weights are sorted so the most significant
    /// influences occupy the first slots.
    pub bone_influences: u8,
    /// Always lay out a normal slot; absent source normals are flagged for
    /// generation by the consumer.
    pub require_normals: bool,
    /// Always lay out a tangent slot; absent source tangents are flagged
    /// for generation by the consumer.
    pub require_tangents: bool,
}

impl ImportSettings {
    /// Set the yield policy.
    #[must_use]
    pub fn with_yield_policy(mut self, policy: YieldPolicy) -> Self {
        self.yield_policy = policy;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set the consuming skinning path's influence count.
    #[must_use]
    pub fn with_bone_influences(mut self, influences: u8) -> Self {
        self.bone_influences = influences.clamp(1, 4);
        self
    }

    /// Require a normal slot in every vertex layout.
    #[must_use]
    pub fn with_require_normals(mut self, require: bool) -> Self {
        self.require_normals = require;
        self
    }

    /// Require a tangent slot in every vertex layout.
    #[must_use]
    pub fn with_require_tangents(mut self, require: bool) -> Self {
        self.require_tangents = require;
        self
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            yield_policy: YieldPolicy::default(),
            cancellation: None,
            bone_influences: 4,
            require_normals: false,
            require_tangents: false,
        }
    }
}

/// Everything one import produced.
///
/// All decoded buffers are volatile: they live until this result is
/// dropped, and consumers copy or upload what they need.
pub struct ImportResult {
    /// Whether every primitive decoded. `false` signals partial failure;
    /// whatever did succeed is still present for best-effort rendering.
    pub success: bool,
    /// The document model, for pulling accessor/material/texture metadata.
    pub document: Document,
    /// Scene trees with converted transforms.
    pub scenes: Vec<Scene>,
    /// Default scene index.
    pub default_scene: Option<usize>,
    /// Vertex layouts created during this import.
    pub layouts: Vec<Arc<VertexLayout>>,
    /// Decoded vertex data, one entry per primitive cluster.
    pub clusters: Vec<PrimitiveCluster>,
    /// Decoded primitives referencing their clusters.
    pub primitives: Vec<DecodedPrimitive>,
    /// Decoded skins with converted inverse bind matrices.
    pub skins: Vec<SceneSkin>,
    /// Decoded animations with converted values.
    pub animations: Vec<Animation>,
    /// Usage tag per accessor, from the consistency-check pass.
    pub accessor_usages: Vec<Option<AccessorUsage>>,
    /// Severity-tagged log of everything the import noticed.
    pub report: ImportReport,
}

/// Session state shared by all phases of one import.
struct ImportSession {
    settings: ImportSettings,
    timer: Arc<YieldTimer>,
    report: ImportReport,
}

impl ImportSession {
    fn new(settings: ImportSettings) -> Self {
        let timer = Arc::new(YieldTimer::new(settings.yield_policy));
        Self {
            settings,
            timer,
            report: ImportReport::new(),
        }
    }

    /// A checkpoint future: yields per the policy and checks cancellation.
    fn checkpoint(&self) -> Checkpoint {
        match &self.settings.cancellation {
            Some(token) => Checkpoint::with_token(&self.timer, token.clone()),
            None => Checkpoint::yield_only(&self.timer),
        }
    }
}

/// Per-primitive scheduling state between the schedule and materialize
/// phases.
struct PrimitivePlan {
    label: String,
    cluster: usize,
    topology: PrimitiveTopology,
    resolution: Option<IndexResolution>,
    material: Option<usize>,
    failed: bool,
}

/// Imports a glTF asset from `.glb` or `.gltf` bytes.
///
/// External buffer URIs are fetched through `provider`; pass `None` for
/// self-contained assets. The returned future suspends at checkpoints and
/// is driven by manual polling (no async runtime required); see
/// [`import_gltf_blocking`] for a synchronous wrapper.
pub async fn import_gltf(
    data: &[u8],
    provider: Option<&dyn FetchProvider>,
    settings: ImportSettings,
) -> Result<ImportResult, GltfError> {
    let mut session = ImportSession::new(settings);

    // Container and JSON parse.
    let (json_bytes, bin_chunk) = if glb::is_binary(data) {
        let glb = glb::parse(data)?;
        (glb.json, glb.bin)
    } else {
        (data, None)
    };
    let text = std::str::from_utf8(json_bytes).map_err(GltfError::InvalidJsonText)?;
    let mut document = Document::from_json_text(text)?;
    session.checkpoint().await?;

    document.check_extensions(&mut session.report)?;

    // Buffer resolution.
    document.resolve_embedded_buffers(bin_chunk)?;
    let unresolved = document.unresolved_buffers();
    if !unresolved.is_empty() {
        let Some(provider) = provider else {
            let (_, uri) = &unresolved[0];
            return Err(GltfError::DownloadFailed {
                uri: uri.clone(),
                message: "no fetch provider supplied".into(),
            });
        };
        // Start every fetch, then await them; the waits overlap.
        let pending: Vec<_> = unresolved
            .into_iter()
            .map(|(index, uri)| {
                let handle = provider.fetch(&uri);
                (index, uri, handle)
            })
            .collect();
        for (index, uri, handle) in pending {
            match handle.await {
                Some(Ok(bytes)) => document.inject_buffer(index, bytes)?,
                Some(Err(message)) => return Err(GltfError::DownloadFailed { uri, message }),
                None => {
                    return Err(GltfError::DownloadFailed {
                        uri,
                        message: "provider dropped the request".into(),
                    })
                }
            }
        }
    }
    session.checkpoint().await?;

    // Usage assignment and consistency checks.
    let accessor_usages = document.assign_usages(&mut session.report);
    session.checkpoint().await?;

    // Job scheduling: cluster primitives by signature, then schedule vertex,
    // morph, and index decodes.
    let mut scheduler = JobScheduler::new();
    let mut new_layouts: Vec<Arc<VertexLayout>> = Vec::new();
    let mut cluster_map: HashMap<PrimitiveSignature, usize> = HashMap::new();
    let mut cluster_plans: Vec<Option<ClusterPlan>> = Vec::new();
    let mut primitive_plans: Vec<PrimitivePlan> = Vec::new();
    let mut mesh_primitive_map: Vec<Vec<usize>> = Vec::new();

    for mesh_index in 0..document.meshes().len() {
        let mut flat_indices = Vec::new();
        for primitive_index in 0..document.meshes()[mesh_index].primitives.len() {
            let primitive = &document.meshes()[mesh_index].primitives[primitive_index];
            let label = format!("mesh {mesh_index} primitive {primitive_index}");
            let mode = primitive.mode;
            let indices_accessor = primitive.indices;
            let material = primitive.material;

            let signature = PrimitiveSignature::of(primitive);
            let cluster = match cluster_map.get(&signature) {
                Some(&existing) => existing,
                None => {
                    let plan = vertex::schedule_cluster(
                        &document,
                        mesh_index,
                        primitive_index,
                        &session.settings,
                        &mut scheduler,
                        &mut session.report,
                        &[],
                        &mut new_layouts,
                    );
                    let index = cluster_plans.len();
                    cluster_plans.push(plan);
                    cluster_map.insert(signature, index);
                    index
                }
            };

            let topology = indices::map_draw_mode(mode, &label, &mut session.report);
            let vertex_count = cluster_plans[cluster]
                .as_ref()
                .map(ClusterPlan::vertex_count)
                .unwrap_or(0);
            let (resolution, failed) = match topology {
                Some(topology) if cluster_plans[cluster].is_some() => {
                    match indices::resolve_indices(
                        &document,
                        indices_accessor,
                        vertex_count,
                        topology,
                        mode,
                        &mut scheduler,
                    ) {
                        Ok(resolution) => (Some(resolution), false),
                        Err(e) => {
                            session
                                .report
                                .error(codes::PRIMITIVE_FAILED, format!("{label}: {e}"));
                            (None, true)
                        }
                    }
                }
                _ => (None, true),
            };

            flat_indices.push(primitive_plans.len());
            primitive_plans.push(PrimitivePlan {
                label,
                cluster,
                topology: topology.unwrap_or_default(),
                resolution,
                material,
                failed,
            });
        }
        mesh_primitive_map.push(flat_indices);
        session.checkpoint().await?;
    }

    // Dispatch until the job graph drains, yielding between batches.
    while scheduler.has_pending() {
        scheduler.dispatch();
        session.checkpoint().await?;
    }

    // Materialize clusters, then primitives.
    let clusters: Vec<PrimitiveCluster> = cluster_plans
        .into_iter()
        .map(|plan| match plan {
            Some(plan) => vertex::finalize_cluster(plan, &scheduler, &mut session.report),
            None => PrimitiveCluster::failed(),
        })
        .collect();

    let mut primitives = Vec::with_capacity(primitive_plans.len());
    for plan in primitive_plans {
        let cluster_failed = clusters[plan.cluster].is_failed();
        let index_list = match plan.resolution {
            Some(resolution) if !plan.failed && !cluster_failed => {
                indices::finalize_indices(resolution, &scheduler, &plan.label, &mut session.report)
            }
            _ => None,
        };
        let failed = plan.failed || cluster_failed || index_list.is_none();
        primitives.push(DecodedPrimitive {
            cluster: plan.cluster,
            topology: plan.topology,
            indices: index_list,
            material: plan.material,
            failed,
        });
    }
    drop(scheduler);
    session.checkpoint().await?;

    // Skins, animations, scenes.
    let skins = load_skins(&document, &mut session.report);
    let animations = load_animations(&document, &mut session.report);
    session.checkpoint().await?;

    let scenes = load_scenes(&document, &mesh_primitive_map)?;
    let default_scene = document.root().scene;

    let success = !session.report.has_errors();
    Ok(ImportResult {
        success,
        document,
        scenes,
        default_scene,
        layouts: new_layouts,
        clusters,
        primitives,
        skins,
        animations,
        accessor_usages,
        report: session.report,
    })
}

/// Drives [`import_gltf`] to completion on the calling thread.
pub fn import_gltf_blocking(
    data: &[u8],
    provider: Option<&dyn FetchProvider>,
    settings: ImportSettings,
) -> Result<ImportResult, GltfError> {
    let mut future = Box::pin(import_gltf(data, provider, settings));
    let waker = noop_waker();
    let mut cx = std::task::Context::from_waker(&waker);
    loop {
        match future.as_mut().poll(&mut cx) {
            std::task::Poll::Ready(result) => return result,
            std::task::Poll::Pending => std::thread::yield_now(),
        }
    }
}

const IDENTITY_MAT4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

fn load_skins(document: &Document, report: &mut ImportReport) -> Vec<SceneSkin> {
    let mut result = Vec::new();
    for (skin_index, skin) in document.skins().iter().enumerate() {
        let mut matrices: Vec<[f32; 16]> = match skin.inverse_bind_matrices {
            Some(accessor_index) => {
                let decoded = document
                    .resolve_accessor(accessor_index)
                    .and_then(|resolved| {
                        accessor::read_floats(&resolved, FloatTarget::MirroredMat4)
                    });
                match decoded {
                    Ok(values) => values
                        .chunks_exact(16)
                        .map(|chunk| {
                            let mut matrix = [0.0f32; 16];
                            matrix.copy_from_slice(chunk);
                            matrix
                        })
                        .collect(),
                    Err(e) => {
                        report.warning(
                            codes::SKIN_DATA,
                            format!("skin {skin_index}: inverse bind matrices not decoded: {e}"),
                        );
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };
        if matrices.len() != skin.joints.len() {
            if !matrices.is_empty() {
                report.warning(
                    codes::SKIN_JOINT_MISMATCH,
                    format!(
                        "skin {skin_index} has {} joints but {} inverse bind matrices",
                        skin.joints.len(),
                        matrices.len()
                    ),
                );
            }
            matrices.resize(skin.joints.len(), IDENTITY_MAT4);
        }
        result.push(SceneSkin {
            name: skin.name.clone(),
            joints: skin.joints.clone(),
            inverse_bind_matrices: matrices,
            skeleton: skin.skeleton,
        });
    }
    result
}

fn load_animations(document: &Document, report: &mut ImportReport) -> Vec<Animation> {
    let mut result = Vec::new();
    for (animation_index, animation) in document.animations().iter().enumerate() {
        let mut channels = Vec::new();
        for (channel_index, channel) in animation.channels.iter().enumerate() {
            let context = format!("animation {animation_index} channel {channel_index}");
            let Some(target_node) = channel.target.node else {
                report.warning(
                    codes::ANIMATION_CHANNEL,
                    format!("{context} has no target node"),
                );
                continue;
            };
            let Some(sampler) = animation.samplers.get(channel.sampler) else {
                report.warning(
                    codes::ANIMATION_CHANNEL,
                    format!("{context} references sampler {} out of range", channel.sampler),
                );
                continue;
            };
            let property = match channel.target.path.as_str() {
                "translation" => AnimationProperty::Translation,
                "rotation" => AnimationProperty::Rotation,
                "scale" => AnimationProperty::Scale,
                "weights" => AnimationProperty::MorphTargetWeights,
                other => {
                    report.warning(
                        codes::ANIMATION_CHANNEL,
                        format!("{context} has unknown path '{other}'"),
                    );
                    continue;
                }
            };
            let interpolation = match sampler.interpolation.as_str() {
                "STEP" => Interpolation::Step,
                "CUBICSPLINE" => Interpolation::CubicSpline,
                _ => Interpolation::Linear,
            };

            let times = match read_channel(document, sampler.input, FloatTarget::Scalar) {
                Ok(times) => times,
                Err(e) => {
                    report.warning(codes::ANIMATION_CHANNEL, format!("{context}: {e}"));
                    continue;
                }
            };
            for window in times.windows(2) {
                if window[1] <= window[0] {
                    report.warning(
                        codes::KEYFRAME_TIMES,
                        format!(
                            "{context} has duplicate or non-increasing keyframe times \
                             ({} then {})",
                            window[0], window[1]
                        ),
                    );
                    break;
                }
            }

            let value_target = match property {
                AnimationProperty::Translation => FloatTarget::MirroredVec3,
                AnimationProperty::Rotation => FloatTarget::MirroredQuat,
                AnimationProperty::Scale => FloatTarget::Vec3,
                AnimationProperty::MorphTargetWeights => FloatTarget::Scalar,
            };
            let values = match read_channel(document, sampler.output, value_target) {
                Ok(values) => values,
                Err(e) => {
                    report.warning(codes::ANIMATION_CHANNEL, format!("{context}: {e}"));
                    continue;
                }
            };

            channels.push(AnimationChannel {
                target_node,
                property,
                interpolation,
                times,
                values,
            });
        }
        result.push(Animation {
            name: animation.name.clone(),
            channels,
        });
    }
    result
}

fn read_channel(
    document: &Document,
    accessor_index: usize,
    target: FloatTarget,
) -> Result<Vec<f32>, String> {
    let resolved = document.resolve_accessor(accessor_index)?;
    accessor::read_floats(&resolved, target)
}

fn load_scenes(
    document: &Document,
    mesh_primitive_map: &[Vec<usize>],
) -> Result<Vec<Scene>, GltfError> {
    let mut scenes = Vec::new();
    for scene_def in document.scenes() {
        let mut roots = Vec::new();
        for &node_index in &scene_def.nodes {
            roots.push(load_node(document, node_index, mesh_primitive_map)?);
        }
        let mut scene = Scene::new().with_nodes(roots);
        if let Some(name) = &scene_def.name {
            scene = scene.with_name(name.clone());
        }
        scenes.push(scene);
    }
    Ok(scenes)
}

fn load_node(
    document: &Document,
    node_index: usize,
    mesh_primitive_map: &[Vec<usize>],
) -> Result<SceneNode, GltfError> {
    let node = document.nodes().get(node_index).ok_or_else(|| {
        GltfError::InvalidDocument(format!("node index {node_index} out of range"))
    })?;

    let mut out = SceneNode::new().with_transform(node_transform(node, node_index)?);
    if let Some(name) = &node.name {
        out = out.with_name(name.clone());
    }
    if let Some(mesh) = node.mesh {
        let primitives = mesh_primitive_map
            .get(mesh)
            .ok_or_else(|| {
                GltfError::InvalidDocument(format!(
                    "node {node_index} references mesh {mesh} out of range"
                ))
            })?
            .clone();
        out = out.with_primitives(primitives);
    }
    if let Some(skin) = node.skin {
        out = out.with_skin(skin);
    }

    let mut children = Vec::with_capacity(node.children.len());
    for &child in &node.children {
        children.push(load_node(document, child, mesh_primitive_map)?);
    }
    if !children.is_empty() {
        out = out.with_children(children);
    }
    Ok(out)
}

/// Resolves a node's local transform, converted to engine space.
///
/// Matrix nodes are mirrored and decomposed; a non-decomposable matrix is
/// fatal for the whole import.
fn node_transform(node: &json::Node, node_index: usize) -> Result<NodeTransform, GltfError> {
    if let Some(matrix) = node.matrix {
        let mut mirrored = matrix;
        math::mirror_x_mat4(&mut mirrored);
        let mat = math::Mat4::from_column_slice(&mirrored);
        let (scale, rotation, translation) = math::to_scale_rotation_translation(&mat)
            .ok_or(GltfError::InvalidNodeTransform { node: node_index })?;
        return Ok(NodeTransform {
            translation: [translation.x, translation.y, translation.z],
            rotation: math::quat_to_array(rotation),
            scale: [scale.x, scale.y, scale.z],
        });
    }
    Ok(NodeTransform {
        translation: math::mirror_x_vec3(node.translation.unwrap_or([0.0, 0.0, 0.0])),
        rotation: math::mirror_x_quat(node.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0])),
        scale: node.scale.unwrap_or([1.0, 1.0, 1.0]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_base64(values: &[f32]) -> String {
        const TABLE: &[u8; 64] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut out = String::new();
        for chunk in bytes.chunks(3) {
            let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
            out.push(TABLE[(b[0] >> 2) as usize] as char);
            out.push(TABLE[(((b[0] & 0x03) << 4) | (b[1] >> 4)) as usize] as char);
            out.push(if chunk.len() > 1 {
                TABLE[(((b[1] & 0x0F) << 2) | (b[2] >> 6)) as usize] as char
            } else {
                '='
            });
            out.push(if chunk.len() > 2 {
                TABLE[(b[2] & 0x3F) as usize] as char
            } else {
                '='
            });
        }
        out
    }

    fn triangle_gltf_text() -> String {
        let payload = f32_base64(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        serde_json::json!({
            "asset": {"version": "2.0"},
            "buffers": [{
                "uri": format!("data:application/octet-stream;base64,{payload}"),
                "byteLength": 36
            }],
            "bufferViews": [{"buffer": 0, "byteLength": 36}],
            "accessors": [{
                "bufferView": 0,
                "componentType": 5126,
                "type": "VEC3",
                "count": 3
            }],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "nodes": [{"mesh": 0}],
            "scenes": [{"nodes": [0]}],
            "scene": 0
        })
        .to_string()
    }

    fn deterministic() -> ImportSettings {
        ImportSettings::default().with_yield_policy(YieldPolicy::Never)
    }

    #[test]
    fn settings_builder() {
        let token = CancellationToken::new();
        let settings = ImportSettings::default()
            .with_yield_policy(YieldPolicy::EveryCheckpoint)
            .with_cancellation(token)
            .with_bone_influences(2)
            .with_require_normals(true);
        assert_eq!(settings.yield_policy, YieldPolicy::EveryCheckpoint);
        assert!(settings.cancellation.is_some());
        assert_eq!(settings.bone_influences, 2);
        assert!(settings.require_normals);
        assert!(!settings.require_tangents);

        // Influence counts clamp into 1..=4.
        assert_eq!(ImportSettings::default().with_bone_influences(0).bone_influences, 1);
        assert_eq!(ImportSettings::default().with_bone_influences(9).bone_influences, 4);
    }

    #[test]
    fn imports_json_text_asset() {
        let text = triangle_gltf_text();
        let result = import_gltf_blocking(text.as_bytes(), None, deterministic()).unwrap();

        assert!(result.success);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.primitives.len(), 1);
        assert_eq!(result.scenes.len(), 1);
        assert_eq!(result.default_scene, Some(0));

        let cluster = &result.clusters[0];
        assert_eq!(cluster.vertex_count(), 3);
        assert_eq!(cluster.vertex_buffer_data(0).unwrap().len(), 36);

        // Synthesized triangle indices are winding-flipped.
        assert_eq!(result.primitives[0].indices.as_deref(), Some(&[0, 2, 1][..]));

        // The scene node references the primitive.
        assert_eq!(result.scenes[0].nodes[0].primitives, vec![0]);
    }

    #[test]
    fn positions_are_mirrored() {
        let text = triangle_gltf_text();
        let result = import_gltf_blocking(text.as_bytes(), None, deterministic()).unwrap();
        let data = result.clusters[0].vertex_buffer_data(0).unwrap();
        let floats = accessor::bytes_to_f32(data);
        assert_eq!(floats[3], -1.0);
        assert_eq!(floats[4], 0.0);
    }

    #[test]
    fn cancelled_before_start_fails() {
        let token = CancellationToken::new();
        token.cancel();
        let settings = ImportSettings::default()
            .with_yield_policy(YieldPolicy::EveryCheckpoint)
            .with_cancellation(token);
        let text = triangle_gltf_text();
        let result = import_gltf_blocking(text.as_bytes(), None, settings);
        assert!(matches!(result, Err(GltfError::Cancelled)));
    }

    #[test]
    fn missing_provider_for_external_buffer_fails() {
        let text = serde_json::json!({
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "mesh.bin", "byteLength": 4}]
        })
        .to_string();
        let result = import_gltf_blocking(text.as_bytes(), None, deterministic());
        assert!(matches!(result, Err(GltfError::DownloadFailed { .. })));
    }

    #[test]
    fn node_transforms_convert_to_left_handed() {
        let node: json::Node = serde_json::from_value(serde_json::json!({
            "translation": [1.0, 2.0, 3.0],
            "rotation": [0.1, 0.2, 0.3, 0.9],
            "scale": [2.0, 2.0, 2.0]
        }))
        .unwrap();
        let transform = node_transform(&node, 0).unwrap();
        assert_eq!(transform.translation, [-1.0, 2.0, 3.0]);
        assert_eq!(transform.rotation, [0.1, -0.2, -0.3, 0.9]);
        assert_eq!(transform.scale, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn matrix_node_decomposes() {
        // Column-major translation by (1, 2, 3).
        let node: json::Node = serde_json::from_value(serde_json::json!({
            "matrix": [
                1.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                1.0, 2.0, 3.0, 1.0
            ]
        }))
        .unwrap();
        let transform = node_transform(&node, 0).unwrap();
        assert_eq!(transform.translation, [-1.0, 2.0, 3.0]);
        assert_eq!(transform.scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn degenerate_matrix_node_is_fatal() {
        let node: json::Node = serde_json::from_value(serde_json::json!({
            "matrix": [
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0,
                1.0, 2.0, 3.0, 1.0
            ]
        }))
        .unwrap();
        assert!(matches!(
            node_transform(&node, 7),
            Err(GltfError::InvalidNodeTransform { node: 7 })
        ));
    }
}
