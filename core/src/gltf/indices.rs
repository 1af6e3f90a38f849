//! Draw-mode mapping and index list resolution.
//!
//! Strips, fans, line lists, and line loops are coerced to the nearest
//! supported topology with a warning. That matches long-standing importer
//! behavior but is non-conformant to the glTF specification: the coerced
//! index lists are used as-is, so strip/fan connectivity is not rebuilt.

use std::sync::Arc;

use crate::compute::{JobHandle, JobScheduler, OutputBuffer};
use crate::mesh::PrimitiveTopology;

use super::accessor::{self, flipped_position};
use super::document::Document;
use super::report::{codes, ImportReport};

/// Maps a glTF draw mode onto an output topology.
///
/// Returns `None` for modes outside the glTF specification; the primitive
/// then fails while the rest of the scene imports.
pub(crate) fn map_draw_mode(
    mode: u32,
    context: &str,
    report: &mut ImportReport,
) -> Option<PrimitiveTopology> {
    match mode {
        0 => Some(PrimitiveTopology::PointList),
        1 | 2 => {
            report.warning(
                codes::DRAW_MODE_COERCED,
                format!(
                    "{context}: draw mode {} is unsupported, best-effort line strip",
                    if mode == 1 { "lines" } else { "line loop" }
                ),
            );
            Some(PrimitiveTopology::LineStrip)
        }
        3 => Some(PrimitiveTopology::LineStrip),
        4 => Some(PrimitiveTopology::TriangleList),
        5 | 6 => {
            report.warning(
                codes::DRAW_MODE_COERCED,
                format!(
                    "{context}: draw mode {} is unsupported, coerced to triangle list",
                    if mode == 5 { "triangle strip" } else { "triangle fan" }
                ),
            );
            Some(PrimitiveTopology::TriangleList)
        }
        other => {
            report.error(
                codes::PRIMITIVE_FAILED,
                format!("{context}: unknown draw mode {other}"),
            );
            None
        }
    }
}

/// How a primitive's index list is produced.
pub(crate) enum IndexResolution {
    /// Decoded from an explicit accessor by a scheduled unit.
    Scheduled {
        output: Arc<OutputBuffer>,
        handle: JobHandle,
    },
    /// Synthesized inline from the vertex count.
    Immediate(Vec<i32>),
}

/// Resolves a primitive's index list.
///
/// Explicit index accessors are decoded through the accessor engine with a
/// per-triangle winding flip whenever the geometry was X-mirrored (i.e. for
/// triangle output). Absent indices are synthesized: winding-flipped
/// sequential triples for triangles, plain sequential otherwise, with a
/// closing index appended for a source line loop.
pub(crate) fn resolve_indices<'doc>(
    document: &'doc Document,
    indices: Option<usize>,
    vertex_count: usize,
    topology: PrimitiveTopology,
    source_mode: u32,
    scheduler: &mut JobScheduler<'doc>,
) -> Result<IndexResolution, String> {
    match indices {
        Some(accessor_index) => {
            let resolved = document.resolve_accessor(accessor_index)?;
            let flip = topology == PrimitiveTopology::TriangleList;
            let output = OutputBuffer::new(resolved.count * 4);
            // Sole writer over a private buffer.
            let writer = unsafe { output.writer(0, 4, 4, resolved.count) };
            let handle = accessor::schedule_index_decode(scheduler, resolved, flip, writer)?;
            Ok(IndexResolution::Scheduled { output, handle })
        }
        None => Ok(IndexResolution::Immediate(synthesize_indices(
            vertex_count,
            topology,
            source_mode,
        ))),
    }
}

/// Synthesizes a sequential index list for an unindexed primitive.
pub(crate) fn synthesize_indices(
    vertex_count: usize,
    topology: PrimitiveTopology,
    source_mode: u32,
) -> Vec<i32> {
    match topology {
        // The flip is an involution within each triple, so the value at
        // output position k is just the flipped position itself.
        PrimitiveTopology::TriangleList => (0..vertex_count)
            .map(|k| flipped_position(k, vertex_count) as i32)
            .collect(),
        _ => {
            let mut out: Vec<i32> = (0..vertex_count as i32).collect();
            // A line loop closes back on its first vertex.
            if source_mode == 2 && vertex_count > 1 {
                out.push(0);
            }
            out
        }
    }
}

/// Materializes a resolution into the final index list.
///
/// Returns `None` (after reporting) when the decode unit failed.
pub(crate) fn finalize_indices(
    resolution: IndexResolution,
    scheduler: &JobScheduler<'_>,
    context: &str,
    report: &mut ImportReport,
) -> Option<Vec<i32>> {
    match resolution {
        IndexResolution::Immediate(indices) => Some(indices),
        IndexResolution::Scheduled { output, handle } => {
            if scheduler.is_failed(handle) {
                report.error(
                    codes::PRIMITIVE_FAILED,
                    format!(
                        "{context}: index decode failed: {}",
                        scheduler.job_error(handle).unwrap_or("unknown error")
                    ),
                );
                return None;
            }
            let bytes = output.into_vec().expect("index unit dropped its writer");
            Some(accessor::bytes_to_i32(&bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::Severity;

    #[test]
    fn triangles_and_points_map_silently() {
        let mut report = ImportReport::new();
        assert_eq!(
            map_draw_mode(4, "test", &mut report),
            Some(PrimitiveTopology::TriangleList)
        );
        assert_eq!(
            map_draw_mode(0, "test", &mut report),
            Some(PrimitiveTopology::PointList)
        );
        assert_eq!(
            map_draw_mode(3, "test", &mut report),
            Some(PrimitiveTopology::LineStrip)
        );
        assert!(report.entries().is_empty());
    }

    #[test]
    fn strip_fan_coerce_with_warning() {
        let mut report = ImportReport::new();
        assert_eq!(
            map_draw_mode(5, "test", &mut report),
            Some(PrimitiveTopology::TriangleList)
        );
        assert_eq!(
            map_draw_mode(6, "test", &mut report),
            Some(PrimitiveTopology::TriangleList)
        );
        assert_eq!(report.count(Severity::Warning), 2);
        assert!(!report.has_errors());
    }

    #[test]
    fn lines_and_loop_coerce_with_warning() {
        let mut report = ImportReport::new();
        assert_eq!(
            map_draw_mode(1, "test", &mut report),
            Some(PrimitiveTopology::LineStrip)
        );
        assert_eq!(
            map_draw_mode(2, "test", &mut report),
            Some(PrimitiveTopology::LineStrip)
        );
        assert_eq!(report.count(Severity::Warning), 2);
    }

    #[test]
    fn unknown_mode_fails() {
        let mut report = ImportReport::new();
        assert_eq!(map_draw_mode(7, "test", &mut report), None);
        assert!(report.has_errors());
    }

    #[test]
    fn synthesized_triangles_flip_winding() {
        assert_eq!(
            synthesize_indices(3, PrimitiveTopology::TriangleList, 4),
            vec![0, 2, 1]
        );
        assert_eq!(
            synthesize_indices(6, PrimitiveTopology::TriangleList, 4),
            vec![0, 2, 1, 3, 5, 4]
        );
    }

    #[test]
    fn synthesized_points_are_sequential() {
        assert_eq!(
            synthesize_indices(4, PrimitiveTopology::PointList, 0),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn synthesized_line_loop_closes() {
        assert_eq!(
            synthesize_indices(4, PrimitiveTopology::LineStrip, 2),
            vec![0, 1, 2, 3, 0]
        );
        // A plain line strip does not close.
        assert_eq!(
            synthesize_indices(4, PrimitiveTopology::LineStrip, 3),
            vec![0, 1, 2, 3]
        );
    }
}
