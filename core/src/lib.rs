//! # Glint Core
//!
//! Engine-agnostic glTF 2.0 import core.
//!
//! Parses binary (`.glb`) and JSON (`.gltf`) assets, decodes accessor data
//! into engine-ready vertex/index/morph buffers, and produces a scene graph
//! with resolved transforms and skins. Geometry is converted from glTF's
//! right-handed Y-up space to a left-handed Y-up convention, with triangle
//! winding flipped to compensate.
//!
//! Downloading external buffers, decoding images, and creating engine
//! objects (meshes, materials, game objects) are the caller's concern; this
//! crate hands over decoded data and document metadata.

pub mod compute;
pub mod gltf;
pub mod math;
pub mod mesh;
pub mod scene;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
