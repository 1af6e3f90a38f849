//! Math type aliases and helper functions.
//!
//! Provides f32 types backed by `nalgebra` plus the coordinate-space
//! conversion family used by the glTF importer: glTF is right-handed Y-up,
//! the engine convention is left-handed Y-up, and the conversion mirrors
//! the X axis. Mirroring one axis is an involution, so every `mirror_x_*`
//! function is its own inverse.

pub use nalgebra;

// ===== Rendering math (always f32) =====

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
/// Use [`quat_from_array`] or `Quaternion::new(w, x, y, z)` to construct.
pub type Quat = nalgebra::Quaternion<f32>;

// ===== Helper functions =====

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Convert a quaternion to a `[x, y, z, w]` array.
pub fn quat_to_array(q: Quat) -> [f32; 4] {
    [q.coords.x, q.coords.y, q.coords.z, q.coords.w]
}

/// Rotate a vector by a quaternion.
pub fn quat_rotate_vec3(q: Quat, v: Vec3) -> Vec3 {
    nalgebra::UnitQuaternion::new_unchecked(q) * v
}

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_unchecked(rotation);
    let m = r.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Decompose a 4x4 matrix into (scale, rotation, translation).
///
/// Returns `None` if any column has zero or non-finite length, i.e. the
/// matrix cannot be expressed as a TRS transform.
pub fn to_scale_rotation_translation(m: &Mat4) -> Option<(Vec3, Quat, Vec3)> {
    let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let col0 = Vec3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
    let col1 = Vec3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
    let col2 = Vec3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);
    let sx = col0.norm();
    let sy = col1.norm();
    let sz = col2.norm();
    if !(sx.is_finite() && sy.is_finite() && sz.is_finite())
        || sx == 0.0
        || sy == 0.0
        || sz == 0.0
        || !translation.iter().all(|c| c.is_finite())
    {
        return None;
    }
    let scale = Vec3::new(sx, sy, sz);
    let rot_mat = nalgebra::Matrix3::from_columns(&[col0 / sx, col1 / sy, col2 / sz]);
    let rotation = nalgebra::UnitQuaternion::from_rotation_matrix(
        &nalgebra::Rotation3::from_matrix_unchecked(rot_mat),
    )
    .into_inner();
    Some((scale, rotation, translation))
}

// ===== Right-handed to left-handed conversion =====

/// Mirror a position or direction across the YZ plane (negate X).
pub fn mirror_x_vec3(v: [f32; 3]) -> [f32; 3] {
    [-v[0], v[1], v[2]]
}

/// Mirror a rotation quaternion `[x, y, z, w]` across the YZ plane.
///
/// Conjugating a rotation by the X-axis flip negates the Y and Z
/// components and leaves X and W unchanged.
pub fn mirror_x_quat(q: [f32; 4]) -> [f32; 4] {
    [q[0], -q[1], -q[2], q[3]]
}

/// Normalize a quaternion array, falling back to identity for degenerate
/// (zero or non-finite length) input.
pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if !len.is_finite() || len == 0.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
}

/// Mirror a column-major 4x4 matrix across the YZ plane.
///
/// Applies the similarity transform `F * M * F` where `F = diag(-1,1,1,1)`:
/// every entry with exactly one index in the X row/column is negated.
/// In column-major storage those are indices 1, 2, 3 (column 0) and
/// 4, 8, 12 (row 0).
pub fn mirror_x_mat4(m: &mut [f32; 16]) {
    for i in [1, 2, 3, 4, 8, 12] {
        m[i] = -m[i];
    }
}
