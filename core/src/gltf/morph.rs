//! Morph target (blend shape) delta decoding.
//!
//! Each target decodes position deltas (required) and optional
//! normal/tangent deltas through the accessor engine, into per-target
//! arrays that are never interleaved with the base mesh. All deltas get the
//! same X-mirroring as the base geometry. Target names come from the mesh's
//! `extras.targetNames` list; unnamed targets use their ordinal index.

use std::sync::Arc;

use crate::compute::{JobHandle, JobScheduler, OutputBuffer};
use crate::mesh::MorphTargetBuffer;

use super::accessor::{self, FloatTarget};
use super::document::Document;
use super::json;

/// Scheduled decode state for one morph target.
pub(crate) struct MorphPlan {
    name: String,
    positions: Arc<OutputBuffer>,
    normals: Option<Arc<OutputBuffer>>,
    tangents: Option<Arc<OutputBuffer>>,
}

/// Resolves target names from `extras.targetNames`, falling back to the
/// ordinal index as a string.
pub(crate) fn target_names(mesh: &json::Mesh, target_count: usize) -> Vec<String> {
    let listed = mesh
        .extras
        .as_ref()
        .and_then(|extras| extras.get("targetNames"))
        .and_then(|names| names.as_array());
    (0..target_count)
        .map(|i| {
            listed
                .and_then(|names| names.get(i))
                .and_then(|name| name.as_str())
                .map(String::from)
                .unwrap_or_else(|| i.to_string())
        })
        .collect()
}

/// Schedules delta decodes for every morph target of a primitive.
///
/// Returns the per-target plans plus the flat list of all handles; the
/// caller folds them into the cluster's completion token. Fails the whole
/// primitive when a target is malformed.
pub(crate) fn schedule_targets<'doc>(
    document: &'doc Document,
    mesh: &json::Mesh,
    primitive: &'doc json::Primitive,
    vertex_count: usize,
    scheduler: &mut JobScheduler<'doc>,
) -> Result<(Vec<MorphPlan>, Vec<JobHandle>), String> {
    let names = target_names(mesh, primitive.targets.len());
    let mut plans = Vec::with_capacity(primitive.targets.len());
    let mut all_handles = Vec::new();

    for (target_index, target) in primitive.targets.iter().enumerate() {
        let position = *target.get("POSITION").ok_or_else(|| {
            format!("morph target {target_index} has no POSITION deltas")
        })?;

        let positions = schedule_delta(
            document,
            position,
            vertex_count,
            target_index,
            scheduler,
            &mut all_handles,
        )?;
        let normals = match target.get("NORMAL") {
            Some(&accessor) => Some(schedule_delta(
                document,
                accessor,
                vertex_count,
                target_index,
                scheduler,
                &mut all_handles,
            )?),
            None => None,
        };
        let tangents = match target.get("TANGENT") {
            Some(&accessor) => Some(schedule_delta(
                document,
                accessor,
                vertex_count,
                target_index,
                scheduler,
                &mut all_handles,
            )?),
            None => None,
        };

        plans.push(MorphPlan {
            name: names[target_index].clone(),
            positions,
            normals,
            tangents,
        });
    }

    Ok((plans, all_handles))
}

fn schedule_delta<'doc>(
    document: &'doc Document,
    accessor_index: usize,
    vertex_count: usize,
    target_index: usize,
    scheduler: &mut JobScheduler<'doc>,
    handles: &mut Vec<JobHandle>,
) -> Result<Arc<OutputBuffer>, String> {
    let resolved = document.resolve_accessor(accessor_index)?;
    if resolved.count != vertex_count {
        return Err(format!(
            "morph target {target_index} accessor {accessor_index} count {} does not match \
             vertex count {vertex_count}",
            resolved.count
        ));
    }
    let output = OutputBuffer::new(vertex_count * 12);
    // Sole writer over a private per-target buffer; morph deltas are
    // X-mirrored like the base geometry.
    let writer = unsafe { output.writer(0, 12, 12, vertex_count) };
    let handle =
        accessor::schedule_float_decode(scheduler, resolved, FloatTarget::MirroredVec3, writer)?;
    handles.push(handle);
    Ok(output)
}

/// Materializes a finished plan into a [`MorphTargetBuffer`].
///
/// Call only after the owning cluster's token reported success.
pub(crate) fn finalize_target(plan: MorphPlan) -> MorphTargetBuffer {
    MorphTargetBuffer::new(
        plan.name,
        take_vec3(plan.positions),
        plan.normals.map(take_vec3),
        plan.tangents.map(take_vec3),
    )
}

fn take_vec3(output: Arc<OutputBuffer>) -> Vec<[f32; 3]> {
    let bytes = output.into_vec().expect("decode units dropped their writers");
    accessor::bytes_to_f32(&bytes)
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_with_extras(extras: Option<serde_json::Value>) -> json::Mesh {
        let mut value = serde_json::json!({
            "primitives": [{"attributes": {"POSITION": 0}}]
        });
        if let Some(extras) = extras {
            value["extras"] = extras;
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn names_from_extras() {
        let mesh = mesh_with_extras(Some(serde_json::json!({
            "targetNames": ["smile", "frown"]
        })));
        assert_eq!(target_names(&mesh, 2), vec!["smile", "frown"]);
    }

    #[test]
    fn ordinal_names_when_unnamed() {
        let mesh = mesh_with_extras(None);
        assert_eq!(target_names(&mesh, 3), vec!["0", "1", "2"]);
    }

    #[test]
    fn partial_name_list_falls_back_to_ordinals() {
        let mesh = mesh_with_extras(Some(serde_json::json!({
            "targetNames": ["smile"]
        })));
        assert_eq!(target_names(&mesh, 2), vec!["smile", "1"]);
    }

    #[test]
    fn schedule_and_finalize_targets() {
        let positions: Vec<u8> = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let deltas: Vec<u8> = [0.5f32, 0.0, 0.0, 0.0, 0.25, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut bin = positions.clone();
        bin.extend_from_slice(&deltas);

        let json = serde_json::json!({
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": bin.len()}],
            "bufferViews": [
                {"buffer": 0, "byteLength": 24},
                {"buffer": 0, "byteOffset": 24, "byteLength": 24}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "type": "VEC3", "count": 2},
                {"bufferView": 1, "componentType": 5126, "type": "VEC3", "count": 2}
            ],
            "meshes": [{
                "primitives": [{
                    "attributes": {"POSITION": 0},
                    "targets": [{"POSITION": 1}]
                }],
                "extras": {"targetNames": ["puff"]}
            }]
        });
        let mut document = Document::from_json_text(&json.to_string()).unwrap();
        document.resolve_embedded_buffers(Some(&bin)).unwrap();

        let mut scheduler = JobScheduler::new();
        let mesh = &document.meshes()[0];
        let primitive = &document.meshes()[0].primitives[0];
        let (plans, handles) =
            schedule_targets(&document, mesh, primitive, 2, &mut scheduler).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(handles.len(), 1);

        while scheduler.has_pending() {
            scheduler.dispatch();
        }
        // All per-target handles fold into one completion token.
        let token = scheduler.join_all(&handles);
        assert!(scheduler.token_complete(&token));
        assert!(!scheduler.token_failed(&token));

        let target = finalize_target(plans.into_iter().next().unwrap());
        assert_eq!(target.name(), "puff");
        // Deltas are X-mirrored.
        assert_eq!(target.positions(), &[[-0.5, 0.0, 0.0], [0.0, 0.25, 0.0]]);
        assert!(target.normals().is_none());
    }

    #[test]
    fn missing_position_deltas_fail() {
        let json = serde_json::json!({
            "asset": {"version": "2.0"},
            "accessors": [
                {"componentType": 5126, "type": "VEC3", "count": 2}
            ],
            "meshes": [{
                "primitives": [{
                    "attributes": {"POSITION": 0},
                    "targets": [{"NORMAL": 0}]
                }]
            }]
        });
        let document = Document::from_json_text(&json.to_string()).unwrap();
        let mut scheduler = JobScheduler::new();
        let mesh = &document.meshes()[0];
        let primitive = &document.meshes()[0].primitives[0];
        assert!(schedule_targets(&document, mesh, primitive, 2, &mut scheduler).is_err());
    }
}
