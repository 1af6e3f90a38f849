//! Vertex buffer assembly: primitive clustering, layout selection, and
//! decode job scheduling.
//!
//! Primitives sharing one attribute/morph-target signature are clustered so
//! their decode work and output buffers are shared. Clustering is purely
//! structural (same accessor indices), never based on material. Per cluster
//! the assembler picks a packed layout — an interleaved main stream of
//! position [+normal] [+tangent], plus separate streams for texture
//! coordinates, colors, and bone data — schedules one decode unit per
//! attribute, and joins the handles into a single completion token. The
//! buffer is not exposed until every contributing unit, including sparse
//! overlays, has completed.

use std::sync::Arc;

use crate::compute::{CompletionToken, JobHandle, JobScheduler, OutputBuffer, StridedWriter};
use crate::mesh::{
    find_or_create_layout, PrimitiveCluster, VertexAttribute, VertexAttributeFormat,
    VertexAttributeSemantic, VertexBufferLayout, VertexLayout,
};

use super::accessor::{self, FloatTarget};
use super::document::Document;
use super::import::ImportSettings;
use super::json;
use super::morph::{self, MorphPlan};
use super::report::{codes, ImportReport};

/// Value-equality key clustering primitives with identical attribute and
/// morph-target accessor sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PrimitiveSignature {
    attributes: Vec<(String, usize)>,
    targets: Vec<Vec<(String, usize)>>,
}

impl PrimitiveSignature {
    /// Builds the signature of a primitive. Attribute maps are ordered, so
    /// equal accessor sets produce equal signatures.
    pub(crate) fn of(primitive: &json::Primitive) -> Self {
        Self {
            attributes: primitive
                .attributes
                .iter()
                .map(|(name, &accessor)| (name.clone(), accessor))
                .collect(),
            targets: primitive
                .targets
                .iter()
                .map(|target| {
                    target
                        .iter()
                        .map(|(name, &accessor)| (name.clone(), accessor))
                        .collect()
                })
                .collect(),
        }
    }
}

/// Scheduled decode state for one primitive cluster.
pub(crate) struct ClusterPlan {
    label: String,
    layout: Arc<VertexLayout>,
    vertex_count: usize,
    outputs: Vec<Arc<OutputBuffer>>,
    token: CompletionToken,
    needs_normals: bool,
    needs_tangents: bool,
    morph_targets: Vec<MorphPlan>,
}

impl ClusterPlan {
    /// Number of vertices in this cluster.
    pub(crate) fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

/// Determines a cluster's layout and schedules all its decode units.
///
/// Returns `None` after reporting when the primitive cannot be decoded; the
/// rest of the scene still imports.
pub(crate) fn schedule_cluster<'doc>(
    document: &'doc Document,
    mesh_index: usize,
    primitive_index: usize,
    settings: &ImportSettings,
    scheduler: &mut JobScheduler<'doc>,
    report: &mut ImportReport,
    existing_layouts: &[Arc<VertexLayout>],
    new_layouts: &mut Vec<Arc<VertexLayout>>,
) -> Option<ClusterPlan> {
    let mesh = &document.meshes()[mesh_index];
    let primitive = &mesh.primitives[primitive_index];
    let label = format!("mesh {mesh_index} primitive {primitive_index}");

    let Some(&position) = primitive.attributes.get("POSITION") else {
        report.error(
            codes::MISSING_POSITIONS,
            format!("{label} has no POSITION attribute"),
        );
        return None;
    };
    let vertex_count = match document.accessor_info(position) {
        Ok(info) => info.count,
        Err(e) => {
            report.error(codes::PRIMITIVE_FAILED, format!("{label}: {e}"));
            return None;
        }
    };

    let has_normal = primitive.attributes.contains_key("NORMAL");
    let has_tangent = primitive.attributes.contains_key("TANGENT");
    let include_normal = has_normal || settings.require_normals;
    let include_tangent = has_tangent || settings.require_tangents;

    // Main interleaved stream: position, then normal, then tangent.
    let normal_offset = 12u32;
    let tangent_offset = if include_normal { 24u32 } else { 12u32 };
    let main_stride =
        12 + if include_normal { 12 } else { 0 } + if include_tangent { 16 } else { 0 };

    let mut layout = VertexLayout::new()
        .with_buffer(VertexBufferLayout::new(main_stride))
        .with_attribute(VertexAttribute::position(0));
    if include_normal {
        layout = layout.with_attribute(VertexAttribute::normal(normal_offset));
    }
    if include_tangent {
        layout = layout.with_attribute(VertexAttribute::tangent(tangent_offset));
    }

    // Texture coordinate sets pack into one side stream, at most 8.
    let mut uv_sets: Vec<(u8, usize)> = primitive
        .attributes
        .iter()
        .filter_map(|(name, &accessor)| {
            name.strip_prefix("TEXCOORD_")
                .and_then(|set| set.parse::<u8>().ok())
                .map(|set| (set, accessor))
        })
        .collect();
    uv_sets.sort_by_key(|(set, _)| *set);
    if uv_sets.len() > 8 {
        report.warning(
            codes::EXCESS_TEXCOORDS,
            format!(
                "{label} has {} texture coordinate sets, only the first 8 are decoded",
                uv_sets.len()
            ),
        );
        uv_sets.truncate(8);
    }

    let uv_stream = if uv_sets.is_empty() {
        None
    } else {
        let stream = layout.buffers.len();
        layout = layout.with_buffer(VertexBufferLayout::new(8 * uv_sets.len() as u32));
        for (slot, (set, _)) in uv_sets.iter().enumerate() {
            layout = layout.with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::TexCoord(*set),
                VertexAttributeFormat::Float2,
                8 * slot as u32,
                stream,
            ));
        }
        Some(stream)
    };

    let color = primitive.attributes.get("COLOR_0").copied();
    let color_stream = if color.is_some() {
        let stream = layout.buffers.len();
        layout = layout.with_buffer(VertexBufferLayout::new(16)).with_attribute(
            VertexAttribute::new(
                VertexAttributeSemantic::Color,
                VertexAttributeFormat::Float4,
                0,
                stream,
            ),
        );
        Some(stream)
    } else {
        None
    };

    let joints = primitive.attributes.get("JOINTS_0").copied();
    let weights = primitive.attributes.get("WEIGHTS_0").copied();
    let bones = match (joints, weights) {
        (Some(joints), Some(weights)) => Some((joints, weights)),
        (None, None) => None,
        _ => {
            report.warning(
                codes::INCOMPLETE_BONE_DATA,
                format!("{label} has JOINTS_0 or WEIGHTS_0 but not both, bone data skipped"),
            );
            None
        }
    };
    let bone_stream = if bones.is_some() {
        let stream = layout.buffers.len();
        layout = layout
            .with_buffer(VertexBufferLayout::new(32))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::Joints,
                VertexAttributeFormat::Uint4,
                0,
                stream,
            ))
            .with_attribute(VertexAttribute::new(
                VertexAttributeSemantic::Weights,
                VertexAttributeFormat::Float4,
                16,
                stream,
            ));
        Some(stream)
    } else {
        None
    };

    let layout = find_or_create_layout(layout, existing_layouts, new_layouts);
    let outputs: Vec<Arc<OutputBuffer>> = layout
        .buffers
        .iter()
        .map(|buffer| OutputBuffer::new(vertex_count * buffer.stride as usize))
        .collect();

    let mut handles: Vec<JobHandle> = Vec::new();
    let schedule = |scheduler: &mut JobScheduler<'doc>,
                        accessor_index: usize,
                        target: FloatTarget,
                        stream: usize,
                        offset: u32|
     -> Result<JobHandle, String> {
        let resolved = document.resolve_accessor(accessor_index)?;
        if resolved.count != vertex_count {
            return Err(format!(
                "accessor {accessor_index} count {} does not match vertex count {vertex_count}",
                resolved.count
            ));
        }
        let stride = layout.buffer_stride(stream) as usize;
        // Attribute columns of one stream are disjoint by construction.
        let writer = unsafe {
            outputs[stream].writer(offset as usize, stride, target.byte_size(), vertex_count)
        };
        accessor::schedule_float_decode(scheduler, resolved, target, writer)
    };

    let mut schedule_all = || -> Result<(), String> {
        handles.push(schedule(scheduler, position, FloatTarget::MirroredVec3, 0, 0)?);
        if has_normal {
            handles.push(schedule(
                scheduler,
                primitive.attributes["NORMAL"],
                FloatTarget::MirroredVec3,
                0,
                normal_offset,
            )?);
        }
        if has_tangent {
            handles.push(schedule(
                scheduler,
                primitive.attributes["TANGENT"],
                FloatTarget::MirroredTangent,
                0,
                tangent_offset,
            )?);
        }
        if let Some(stream) = uv_stream {
            for (slot, (_, accessor_index)) in uv_sets.iter().enumerate() {
                handles.push(schedule(
                    scheduler,
                    *accessor_index,
                    FloatTarget::Vec2,
                    stream,
                    8 * slot as u32,
                )?);
            }
        }
        if let (Some(accessor_index), Some(stream)) = (color, color_stream) {
            handles.push(schedule(
                scheduler,
                accessor_index,
                FloatTarget::ColorRgba,
                stream,
                0,
            )?);
        }
        if let (Some((joints_index, weights_index)), Some(stream)) = (bones, bone_stream) {
            let resolved = document.resolve_accessor(joints_index)?;
            if resolved.count != vertex_count {
                return Err(format!(
                    "accessor {joints_index} count {} does not match vertex count {vertex_count}",
                    resolved.count
                ));
            }
            let joints_writer = unsafe { outputs[stream].writer(0, 32, 16, vertex_count) };
            let joints_handle =
                accessor::schedule_joints_decode(scheduler, resolved, joints_writer)?;
            let weights_handle =
                schedule(scheduler, weights_index, FloatTarget::Vec4, stream, 16)?;
            handles.push(joints_handle);
            handles.push(weights_handle);

            // With fewer than 4 influences, the most significant weights
            // must occupy the first slots. The sort revisits both columns,
            // so it is ordered after both decode units.
            if settings.bone_influences < 4 {
                let joints_view = unsafe { outputs[stream].writer(0, 32, 16, vertex_count) };
                let weights_view = unsafe { outputs[stream].writer(16, 32, 16, vertex_count) };
                let sort_handle = scheduler.spawn_after(
                    move || {
                        sort_bone_influences(&joints_view, &weights_view);
                        Ok(())
                    },
                    &[joints_handle, weights_handle],
                );
                handles.push(sort_handle);
            }
        }
        Ok(())
    };

    if let Err(e) = schedule_all() {
        report.error(codes::PRIMITIVE_FAILED, format!("{label}: {e}"));
        return None;
    }

    let morph_targets = match morph::schedule_targets(document, mesh, primitive, vertex_count, scheduler)
    {
        Ok((plans, morph_handles)) => {
            handles.extend(morph_handles);
            plans
        }
        Err(e) => {
            report.error(codes::MORPH_TARGET, format!("{label}: {e}"));
            return None;
        }
    };

    let token = scheduler.join_all(&handles);
    Some(ClusterPlan {
        label,
        layout,
        vertex_count,
        outputs,
        token,
        needs_normals: include_normal && !has_normal,
        needs_tangents: include_tangent && !has_tangent,
        morph_targets,
    })
}

/// Materializes a finished plan into a [`PrimitiveCluster`].
///
/// Call only once the scheduler has drained; a failed token produces a
/// failed cluster and error entries, while the rest of the scene imports.
pub(crate) fn finalize_cluster(
    plan: ClusterPlan,
    scheduler: &JobScheduler<'_>,
    report: &mut ImportReport,
) -> PrimitiveCluster {
    debug_assert!(scheduler.token_complete(&plan.token));
    if scheduler.token_failed(&plan.token) {
        for message in scheduler.token_errors(&plan.token) {
            report.error(
                codes::PRIMITIVE_FAILED,
                format!("{}: {message}", plan.label),
            );
        }
        return PrimitiveCluster::failed();
    }

    let mut cluster = PrimitiveCluster::new(plan.layout, plan.vertex_count as u32)
        .with_needs_normals(plan.needs_normals)
        .with_needs_tangents(plan.needs_tangents);
    for (stream, output) in plan.outputs.into_iter().enumerate() {
        let data = output.into_vec().expect("decode units dropped their writers");
        cluster = cluster.with_vertex_data(stream, data);
    }
    let targets = plan
        .morph_targets
        .into_iter()
        .map(morph::finalize_target)
        .collect();
    cluster.with_morph_targets(targets)
}

/// Sorts each vertex's four joint/weight pairs by descending weight.
///
/// The already-sorted fast path (each value ≥ the next) skips the per-pair
/// work for the common case of pre-sorted exports.
fn sort_bone_influences(joints: &StridedWriter, weights: &StridedWriter) {
    for i in 0..weights.count() {
        let mut weight_bytes = [0u8; 16];
        weights.read_into(i, &mut weight_bytes);
        let mut w: [f32; 4] = [0.0; 4];
        for (c, value) in w.iter_mut().enumerate() {
            *value = f32::from_le_bytes([
                weight_bytes[c * 4],
                weight_bytes[c * 4 + 1],
                weight_bytes[c * 4 + 2],
                weight_bytes[c * 4 + 3],
            ]);
        }
        if w[0] >= w[1] && w[1] >= w[2] && w[2] >= w[3] {
            continue;
        }

        let mut joint_bytes = [0u8; 16];
        joints.read_into(i, &mut joint_bytes);
        let mut j: [u32; 4] = [0; 4];
        for (c, value) in j.iter_mut().enumerate() {
            *value = u32::from_le_bytes([
                joint_bytes[c * 4],
                joint_bytes[c * 4 + 1],
                joint_bytes[c * 4 + 2],
                joint_bytes[c * 4 + 3],
            ]);
        }

        // Insertion sort over four pairs, descending by weight.
        for a in 1..4 {
            let (weight, joint) = (w[a], j[a]);
            let mut b = a;
            while b > 0 && w[b - 1] < weight {
                w[b] = w[b - 1];
                j[b] = j[b - 1];
                b -= 1;
            }
            w[b] = weight;
            j[b] = joint;
        }

        weights.write(i, bytemuck::cast_slice(&w));
        joints.write(i, bytemuck::cast_slice(&j));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitive(value: serde_json::Value) -> json::Primitive {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn signatures_ignore_material() {
        let a = primitive(serde_json::json!({
            "attributes": {"POSITION": 0, "NORMAL": 1},
            "material": 0
        }));
        let b = primitive(serde_json::json!({
            "attributes": {"NORMAL": 1, "POSITION": 0},
            "material": 5
        }));
        assert_eq!(PrimitiveSignature::of(&a), PrimitiveSignature::of(&b));
    }

    #[test]
    fn signatures_differ_by_accessor() {
        let a = primitive(serde_json::json!({"attributes": {"POSITION": 0}}));
        let b = primitive(serde_json::json!({"attributes": {"POSITION": 1}}));
        assert_ne!(PrimitiveSignature::of(&a), PrimitiveSignature::of(&b));
    }

    #[test]
    fn signatures_differ_by_morph_targets() {
        let a = primitive(serde_json::json!({"attributes": {"POSITION": 0}}));
        let b = primitive(serde_json::json!({
            "attributes": {"POSITION": 0},
            "targets": [{"POSITION": 1}]
        }));
        assert_ne!(PrimitiveSignature::of(&a), PrimitiveSignature::of(&b));
    }

    fn run_sort(joint_data: [u32; 4], weight_data: [f32; 4]) -> ([u32; 4], [f32; 4]) {
        let buffer = OutputBuffer::new(32);
        let joints = unsafe { buffer.writer(0, 32, 16, 1) };
        let weights = unsafe { buffer.writer(16, 32, 16, 1) };
        joints.write(0, bytemuck::cast_slice(&joint_data));
        weights.write(0, bytemuck::cast_slice(&weight_data));

        sort_bone_influences(&joints, &weights);

        let mut jb = [0u8; 16];
        let mut wb = [0u8; 16];
        joints.read_into(0, &mut jb);
        weights.read_into(0, &mut wb);
        let mut j = [0u32; 4];
        let mut w = [0f32; 4];
        for c in 0..4 {
            j[c] = u32::from_le_bytes([jb[c * 4], jb[c * 4 + 1], jb[c * 4 + 2], jb[c * 4 + 3]]);
            w[c] = f32::from_le_bytes([wb[c * 4], wb[c * 4 + 1], wb[c * 4 + 2], wb[c * 4 + 3]]);
        }
        (j, w)
    }

    #[test]
    fn bone_sort_orders_descending_with_paired_joints() {
        let (j, w) = run_sort([10, 20, 30, 40], [0.1, 0.4, 0.2, 0.3]);
        assert_eq!(w, [0.4, 0.3, 0.2, 0.1]);
        assert_eq!(j, [20, 40, 30, 10]);
    }

    #[test]
    fn bone_sort_fast_path_keeps_sorted_data() {
        let (j, w) = run_sort([1, 2, 3, 4], [0.4, 0.3, 0.2, 0.1]);
        assert_eq!(w, [0.4, 0.3, 0.2, 0.1]);
        assert_eq!(j, [1, 2, 3, 4]);
    }

    #[test]
    fn bone_sort_handles_ties() {
        let (j, w) = run_sort([1, 2, 3, 4], [0.25, 0.25, 0.25, 0.25]);
        assert_eq!(w, [0.25; 4]);
        assert_eq!(j, [1, 2, 3, 4]);
    }
}
