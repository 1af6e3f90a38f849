//! glTF 2.0 import core.
//!
//! Parses binary (`.glb`) and JSON (`.gltf`) assets and decodes their
//! accessor data into engine-ready buffers: interleaved vertex streams,
//! widened i32 index lists, morph target deltas, skins, animations, and a
//! scene graph with resolved transforms. Geometry is converted from glTF's
//! right-handed Y-up space to a left-handed Y-up convention, with triangle
//! winding flipped to compensate.
//!
//! # Pipeline
//!
//! Decode work runs as parallel units over disjoint output ranges,
//! coordinated by the job graph in [`crate::compute`]: primitives with
//! identical attribute signatures share one decoded cluster, each
//! attribute decodes independently, and sparse overlays are ordered after
//! their dense fills. The import future suspends at checkpoints so a
//! frame-based host can spread the work over ticks and cancel between
//! phases.
//!
//! # Example
//!
//! ```ignore
//! use glint_core::gltf::{import_gltf_blocking, ImportSettings};
//!
//! let data = std::fs::read("model.glb").unwrap();
//! let result = import_gltf_blocking(&data, None, ImportSettings::default()).unwrap();
//!
//! // Partial failure is a valid outcome; check the flag, not just Err.
//! println!("success: {}", result.success);
//! for cluster in &result.clusters {
//!     println!("cluster: {} vertices", cluster.vertex_count());
//! }
//! ```

mod accessor;
mod document;
mod error;
pub mod glb;
mod import;
mod indices;
pub mod json;
mod morph;
mod report;
#[cfg(test)]
mod tests;
mod vertex;

pub use accessor::{ComponentType, ElementType};
pub use document::{AccessorInfo, AccessorUsage, Document, SUPPORTED_EXTENSIONS};
pub use error::GltfError;
pub use import::{import_gltf, import_gltf_blocking, ImportResult, ImportSettings};
pub use report::{codes, ImportReport, ReportEntry, Severity};
