//! Scene graph data types.
//!
//! All types use plain arrays (`[f32; 3]`, `[f32; 4]`, etc.) so consumers
//! are free to convert into their own math library's types. Transforms are
//! already converted to the engine's left-handed Y-up convention.

/// Node transform decomposed into translation, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Translation [x, y, z].
    pub translation: [f32; 3],
    /// Rotation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Scale [x, y, z].
    pub scale: [f32; 3],
}

impl NodeTransform {
    /// Identity transform: no translation, identity rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// Returns this transform with a different translation.
    #[must_use]
    pub const fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in a scene graph tree.
///
/// Nodes form a recursive tree structure. Each node has a local transform,
/// optional references to decoded resources, and child nodes. Primitive
/// references index the flat primitive list on the import result; skin
/// references index its skin list.
#[derive(Debug)]
pub struct SceneNode {
    /// Node name, if any.
    pub name: Option<String>,
    /// Local transform relative to parent.
    pub transform: NodeTransform,
    /// Indices into the import result's flat primitive list.
    /// Empty if the node carries no mesh.
    pub primitives: Vec<usize>,
    /// Index into the import result's skins, if this node is skinned.
    pub skin: Option<usize>,
    /// Child nodes forming the sub-tree.
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Creates a new node with default (identity) transform and no attachments.
    pub fn new() -> Self {
        Self {
            name: None,
            transform: NodeTransform::IDENTITY,
            primitives: Vec::new(),
            skin: None,
            children: Vec::new(),
        }
    }

    /// Set the node name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the primitive indices.
    #[must_use]
    pub fn with_primitives(mut self, primitives: Vec<usize>) -> Self {
        self.primitives = primitives;
        self
    }

    /// Set the skin index.
    #[must_use]
    pub fn with_skin(mut self, skin: usize) -> Self {
        self.skin = Some(skin);
        self
    }

    /// Set the child nodes.
    #[must_use]
    pub fn with_children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

/// A scene: a forest of node trees.
///
/// Decoded resources (primitive clusters, skins, animations) live on the
/// import result and are shared by all scenes of a document; nodes reference
/// them by index.
#[derive(Debug)]
pub struct Scene {
    /// Scene name, if any.
    pub name: Option<String>,
    /// Root nodes of the scene.
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    /// Creates a new empty scene.
    pub fn new() -> Self {
        Self {
            name: None,
            nodes: Vec::new(),
        }
    }

    /// Set the scene name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the root nodes.
    #[must_use]
    pub fn with_nodes(mut self, nodes: Vec<SceneNode>) -> Self {
        self.nodes = nodes;
        self
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// A skin for skeletal animation.
#[derive(Debug, Clone)]
pub struct SceneSkin {
    /// Skin name.
    pub name: Option<String>,
    /// Joint node indices (referencing document nodes).
    pub joints: Vec<usize>,
    /// Inverse bind matrices (column-major 4x4, one per joint), converted
    /// to the engine's left-handed space.
    pub inverse_bind_matrices: Vec<[f32; 16]>,
    /// Root skeleton node index, if specified.
    pub skeleton: Option<usize>,
}

/// The node property an animation channel drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationProperty {
    /// Node translation, converted like positions.
    Translation,
    /// Node rotation, converted like quaternions.
    Rotation,
    /// Node scale, unconverted.
    Scale,
    /// Morph target weights.
    MorphTargetWeights,
}

/// Keyframe interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Linear interpolation between keyframes.
    Linear,
    /// Hold the previous keyframe's value.
    Step,
    /// Cubic spline with in/out tangents per keyframe.
    CubicSpline,
}

/// One decoded animation channel.
///
/// Values are flat f32 data: 3 per key for translation/scale, 4 per key
/// for rotation, one per key per target for weights. Cubic spline samplers
/// carry three elements per key (in-tangent, value, out-tangent).
#[derive(Debug, Clone)]
pub struct AnimationChannel {
    /// Target node index (referencing document nodes).
    pub target_node: usize,
    /// The property this channel animates.
    pub property: AnimationProperty,
    /// Keyframe interpolation mode.
    pub interpolation: Interpolation,
    /// Keyframe times in seconds, non-decreasing.
    pub times: Vec<f32>,
    /// Decoded keyframe values, already converted to engine space.
    pub values: Vec<f32>,
}

/// A decoded keyframe animation.
#[derive(Debug, Clone)]
pub struct Animation {
    /// Animation name, if any.
    pub name: Option<String>,
    /// All channels of this animation.
    pub channels: Vec<AnimationChannel>,
}
