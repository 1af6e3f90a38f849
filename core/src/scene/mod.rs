//! Scene graph data types produced by the importer.

mod types;

pub use types::{
    Animation, AnimationChannel, AnimationProperty, Interpolation, NodeTransform, Scene, SceneNode,
    SceneSkin,
};
