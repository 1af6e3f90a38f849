//! Typed accessor decoding.
//!
//! Turns raw accessor bytes into engine-ready values: f32 attributes with
//! optional normalization and coordinate conversion, u32 joint indices, and
//! i32 index lists with optional winding flip. The per-element loops are
//! monomorphized over the component type through the sealed [`Component`]
//! trait, so there is no dynamic dispatch inside them.
//!
//! Decoding is expressed as units for the [`JobScheduler`]: a dense fill
//! pass, optionally followed by a sparse overlay pass ordered after it,
//! both writing through a bounds-checked [`StridedWriter`]. The same passes
//! can also run inline for small synchronous reads (animation channels,
//! inverse bind matrices).

use crate::compute::{JobHandle, JobScheduler, OutputBuffer, StridedWriter};
use crate::math::{mirror_x_mat4, normalize_quat};

/// glTF accessor component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Signed 8-bit integer (5120).
    Byte,
    /// Unsigned 8-bit integer (5121).
    UnsignedByte,
    /// Signed 16-bit integer (5122).
    Short,
    /// Unsigned 16-bit integer (5123).
    UnsignedShort,
    /// Unsigned 32-bit integer (5125).
    UnsignedInt,
    /// 32-bit float (5126).
    Float,
}

impl ComponentType {
    /// Maps a glTF `componentType` constant.
    pub fn from_gltf(value: u32) -> Option<Self> {
        match value {
            5120 => Some(Self::Byte),
            5121 => Some(Self::UnsignedByte),
            5122 => Some(Self::Short),
            5123 => Some(Self::UnsignedShort),
            5125 => Some(Self::UnsignedInt),
            5126 => Some(Self::Float),
            _ => None,
        }
    }

    /// Size of one component in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
        }
    }

    /// Whether this is the float component type.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float)
    }

    /// Whether this type can carry index data (unsigned integer).
    pub const fn is_index(self) -> bool {
        matches!(self, Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt)
    }
}

/// glTF accessor element shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Single value.
    Scalar,
    /// Two components.
    Vec2,
    /// Three components.
    Vec3,
    /// Four components.
    Vec4,
    /// 2x2 matrix.
    Mat2,
    /// 3x3 matrix.
    Mat3,
    /// 4x4 matrix.
    Mat4,
}

impl ElementType {
    /// Maps a glTF `type` string.
    pub fn from_gltf(value: &str) -> Option<Self> {
        match value {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    /// Number of components per element.
    pub const fn component_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i8 {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
}

/// A decodable component, monomorphized into the per-element loops.
pub(crate) trait Component: sealed::Sealed + Copy + Send {
    const SIZE: usize;
    const IS_FLOAT: bool;

    fn read(bytes: &[u8]) -> Self;

    /// Maps to `[-1, 1]` (signed) or `[0, 1]` (unsigned). Signed results
    /// are clamped at -1.0 because the two's-complement minimum would
    /// otherwise land just below it.
    fn normalize(self) -> f32;

    fn to_f32(self) -> f32;
}

/// Unsigned component usable as an index or joint value.
pub(crate) trait IndexComponent: Component {
    fn widen(self) -> u32;
}

impl Component for i8 {
    const SIZE: usize = 1;
    const IS_FLOAT: bool = false;
    fn read(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
    fn normalize(self) -> f32 {
        (self as f32 / 127.0).max(-1.0)
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Component for u8 {
    const SIZE: usize = 1;
    const IS_FLOAT: bool = false;
    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }
    fn normalize(self) -> f32 {
        self as f32 / 255.0
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Component for i16 {
    const SIZE: usize = 2;
    const IS_FLOAT: bool = false;
    fn read(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
    fn normalize(self) -> f32 {
        (self as f32 / 32767.0).max(-1.0)
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Component for u16 {
    const SIZE: usize = 2;
    const IS_FLOAT: bool = false;
    fn read(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
    fn normalize(self) -> f32 {
        self as f32 / 65535.0
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Component for u32 {
    const SIZE: usize = 4;
    const IS_FLOAT: bool = false;
    fn read(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
    fn normalize(self) -> f32 {
        (self as f64 / 4294967295.0) as f32
    }
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl Component for f32 {
    const SIZE: usize = 4;
    const IS_FLOAT: bool = true;
    fn read(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
    fn normalize(self) -> f32 {
        self
    }
    fn to_f32(self) -> f32 {
        self
    }
}

impl IndexComponent for u8 {
    fn widen(self) -> u32 {
        self as u32
    }
}

impl IndexComponent for u16 {
    fn widen(self) -> u32 {
        self as u32
    }
}

impl IndexComponent for u32 {
    fn widen(self) -> u32 {
        self
    }
}

/// Dense accessor bytes: the slice starts at the accessor's first element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DenseSource<'a> {
    pub bytes: &'a [u8],
    /// Effective input stride (the bufferView's, or tightly packed).
    pub stride: usize,
}

/// Sparse overlay data; indices and values are tightly packed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SparseSource<'a> {
    pub count: usize,
    pub index_type: ComponentType,
    pub indices: &'a [u8],
    pub values: &'a [u8],
}

/// An accessor with its data slices resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedAccessor<'a> {
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub count: usize,
    pub normalized: bool,
    /// Absent for pure-sparse or compressed-placeholder accessors.
    pub dense: Option<DenseSource<'a>>,
    pub sparse: Option<SparseSource<'a>>,
}

/// What an f32 decode should produce per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FloatTarget {
    /// One f32 (animation times, morph weights).
    Scalar,
    /// Two f32 (texture coordinates).
    Vec2,
    /// Three f32, unconverted (scale).
    Vec3,
    /// Three f32 with X negated (positions, normals, deltas, translations).
    MirroredVec3,
    /// Four f32, unconverted (weights, generic).
    Vec4,
    /// Four f32 with X negated, handedness w untouched (tangents).
    MirroredTangent,
    /// RGBA f32; RGB sources get alpha = 1.
    ColorRgba,
    /// Quaternion with Y and Z negated; renormalized unless the source was
    /// float-exact.
    MirroredQuat,
    /// Column-major 4x4 under the axis-flip similarity transform.
    MirroredMat4,
}

impl FloatTarget {
    /// Components written per element.
    pub(crate) const fn out_components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 | Self::MirroredVec3 => 3,
            Self::Vec4 | Self::MirroredTangent | Self::ColorRgba | Self::MirroredQuat => 4,
            Self::MirroredMat4 => 16,
        }
    }

    /// Output element size in bytes.
    pub(crate) const fn byte_size(self) -> usize {
        self.out_components() * 4
    }

    fn accepts(self, element: ElementType) -> bool {
        match self {
            Self::Scalar => element == ElementType::Scalar,
            Self::Vec2 => element == ElementType::Vec2,
            Self::Vec3 | Self::MirroredVec3 => element == ElementType::Vec3,
            Self::Vec4 | Self::MirroredTangent | Self::MirroredQuat => {
                element == ElementType::Vec4
            }
            Self::ColorRgba => matches!(element, ElementType::Vec3 | ElementType::Vec4),
            Self::MirroredMat4 => element == ElementType::Mat4,
        }
    }
}

// ---------------------------------------------------------------------------
// f32 decoding
// ---------------------------------------------------------------------------

/// Schedules the dense and (when present) sparse passes of an f32 decode.
///
/// Returns the handle of the last pass, which completes only after the
/// whole accessor is decoded. Fails without scheduling when the accessor
/// cannot be decoded into the target at all.
pub(crate) fn schedule_float_decode<'s>(
    scheduler: &mut JobScheduler<'s>,
    accessor: ResolvedAccessor<'s>,
    target: FloatTarget,
    writer: StridedWriter,
) -> Result<JobHandle, String> {
    validate_float(&accessor, target)?;

    let dense_handle = accessor.dense.map(|dense| {
        let dense_writer = writer.clone();
        scheduler.spawn(move || run_float_dense(&accessor, dense, target, &dense_writer))
    });
    if let Some(sparse) = accessor.sparse {
        let sparse_writer = writer;
        let unit = move || run_float_sparse(&accessor, sparse, target, &sparse_writer);
        let handle = match dense_handle {
            // The overlay partially overwrites the dense results, so it is
            // ordered after them.
            Some(dense) => scheduler.spawn_after(unit, &[dense]),
            None => scheduler.spawn(unit),
        };
        return Ok(handle);
    }
    dense_handle.ok_or_else(|| "accessor carries no retrievable data".to_string())
}

/// Decodes an accessor to a flat f32 vector inline, without the scheduler.
///
/// Used for small synchronous reads: animation channels and inverse bind
/// matrices.
pub(crate) fn read_floats(
    accessor: &ResolvedAccessor<'_>,
    target: FloatTarget,
) -> Result<Vec<f32>, String> {
    validate_float(accessor, target)?;
    if accessor.dense.is_none() && accessor.sparse.is_none() {
        return Err("accessor carries no retrievable data".into());
    }

    let elem = target.byte_size();
    let buffer = OutputBuffer::new(accessor.count * elem);
    // Sole writer over a private buffer.
    let writer = unsafe { buffer.writer(0, elem, elem, accessor.count) };
    if let Some(dense) = accessor.dense {
        run_float_dense(accessor, dense, target, &writer)?;
    }
    if let Some(sparse) = accessor.sparse {
        run_float_sparse(accessor, sparse, target, &writer)?;
    }
    drop(writer);

    let bytes = buffer.into_vec().expect("no writers remain");
    Ok(bytes_to_f32(&bytes))
}

fn validate_float(accessor: &ResolvedAccessor<'_>, target: FloatTarget) -> Result<(), String> {
    if !target.accepts(accessor.element_type) {
        return Err(format!(
            "element type {:?} is not valid for {:?}",
            accessor.element_type, target
        ));
    }
    if accessor.component_type.is_float() && accessor.normalized {
        return Err("float accessors must not be normalized".into());
    }
    if let Some(sparse) = &accessor.sparse {
        if !sparse.index_type.is_index() {
            return Err(format!(
                "sparse index type {:?} is not an unsigned integer",
                sparse.index_type
            ));
        }
    }
    Ok(())
}

fn run_float_dense(
    accessor: &ResolvedAccessor<'_>,
    dense: DenseSource<'_>,
    target: FloatTarget,
    writer: &StridedWriter,
) -> Result<(), String> {
    let comps = accessor.element_type.component_count();
    match accessor.component_type {
        ComponentType::Byte => {
            float_dense_loop::<i8>(dense, accessor.count, comps, accessor.normalized, target, writer)
        }
        ComponentType::UnsignedByte => {
            float_dense_loop::<u8>(dense, accessor.count, comps, accessor.normalized, target, writer)
        }
        ComponentType::Short => {
            float_dense_loop::<i16>(dense, accessor.count, comps, accessor.normalized, target, writer)
        }
        ComponentType::UnsignedShort => {
            float_dense_loop::<u16>(dense, accessor.count, comps, accessor.normalized, target, writer)
        }
        ComponentType::UnsignedInt => {
            float_dense_loop::<u32>(dense, accessor.count, comps, accessor.normalized, target, writer)
        }
        ComponentType::Float => {
            float_dense_loop::<f32>(dense, accessor.count, comps, accessor.normalized, target, writer)
        }
    }
}

fn float_dense_loop<T: Component>(
    dense: DenseSource<'_>,
    count: usize,
    comps: usize,
    normalized: bool,
    target: FloatTarget,
    writer: &StridedWriter,
) -> Result<(), String> {
    let elem_bytes = comps * T::SIZE;
    check_dense_bounds(&dense, count, elem_bytes)?;

    let mut vals = [0.0f32; 16];
    for i in 0..count {
        let base = i * dense.stride;
        read_components::<T>(&dense.bytes[base..base + elem_bytes], comps, normalized, &mut vals);
        let out = apply_target(target, comps, T::IS_FLOAT, &mut vals);
        writer.write(i, bytemuck::cast_slice(&vals[..out]));
    }
    Ok(())
}

fn run_float_sparse(
    accessor: &ResolvedAccessor<'_>,
    sparse: SparseSource<'_>,
    target: FloatTarget,
    writer: &StridedWriter,
) -> Result<(), String> {
    match sparse.index_type {
        ComponentType::UnsignedByte => run_float_sparse_values::<u8>(accessor, sparse, target, writer),
        ComponentType::UnsignedShort => {
            run_float_sparse_values::<u16>(accessor, sparse, target, writer)
        }
        ComponentType::UnsignedInt => run_float_sparse_values::<u32>(accessor, sparse, target, writer),
        other => Err(format!("sparse index type {other:?} is not an unsigned integer")),
    }
}

fn run_float_sparse_values<TI: IndexComponent>(
    accessor: &ResolvedAccessor<'_>,
    sparse: SparseSource<'_>,
    target: FloatTarget,
    writer: &StridedWriter,
) -> Result<(), String> {
    let comps = accessor.element_type.component_count();
    let normalized = accessor.normalized;
    match accessor.component_type {
        ComponentType::Byte => float_sparse_loop::<TI, i8>(sparse, comps, normalized, target, writer),
        ComponentType::UnsignedByte => {
            float_sparse_loop::<TI, u8>(sparse, comps, normalized, target, writer)
        }
        ComponentType::Short => float_sparse_loop::<TI, i16>(sparse, comps, normalized, target, writer),
        ComponentType::UnsignedShort => {
            float_sparse_loop::<TI, u16>(sparse, comps, normalized, target, writer)
        }
        ComponentType::UnsignedInt => {
            float_sparse_loop::<TI, u32>(sparse, comps, normalized, target, writer)
        }
        ComponentType::Float => float_sparse_loop::<TI, f32>(sparse, comps, normalized, target, writer),
    }
}

fn float_sparse_loop<TI: IndexComponent, TV: Component>(
    sparse: SparseSource<'_>,
    comps: usize,
    normalized: bool,
    target: FloatTarget,
    writer: &StridedWriter,
) -> Result<(), String> {
    let elem_bytes = comps * TV::SIZE;
    check_sparse_bounds::<TI>(&sparse, elem_bytes)?;

    let mut vals = [0.0f32; 16];
    for k in 0..sparse.count {
        let idx = TI::read(&sparse.indices[k * TI::SIZE..(k + 1) * TI::SIZE]).widen() as usize;
        if idx >= writer.count() {
            return Err(format!(
                "sparse patch index {idx} out of range for {} elements",
                writer.count()
            ));
        }
        let base = k * elem_bytes;
        read_components::<TV>(&sparse.values[base..base + elem_bytes], comps, normalized, &mut vals);
        let out = apply_target(target, comps, TV::IS_FLOAT, &mut vals);
        writer.write(idx, bytemuck::cast_slice(&vals[..out]));
    }
    Ok(())
}

#[inline]
fn read_components<T: Component>(
    bytes: &[u8],
    comps: usize,
    normalized: bool,
    out: &mut [f32; 16],
) {
    for c in 0..comps {
        let v = T::read(&bytes[c * T::SIZE..(c + 1) * T::SIZE]);
        out[c] = if normalized { v.normalize() } else { v.to_f32() };
    }
}

#[inline]
fn apply_target(
    target: FloatTarget,
    src_comps: usize,
    source_is_float: bool,
    vals: &mut [f32; 16],
) -> usize {
    match target {
        FloatTarget::Scalar => 1,
        FloatTarget::Vec2 => 2,
        FloatTarget::Vec3 => 3,
        FloatTarget::MirroredVec3 => {
            vals[0] = -vals[0];
            3
        }
        FloatTarget::Vec4 => 4,
        FloatTarget::MirroredTangent => {
            vals[0] = -vals[0];
            4
        }
        FloatTarget::ColorRgba => {
            if src_comps == 3 {
                vals[3] = 1.0;
            }
            4
        }
        FloatTarget::MirroredQuat => {
            vals[1] = -vals[1];
            vals[2] = -vals[2];
            if !source_is_float {
                let n = normalize_quat([vals[0], vals[1], vals[2], vals[3]]);
                vals[..4].copy_from_slice(&n);
            }
            4
        }
        FloatTarget::MirroredMat4 => {
            mirror_x_mat4(vals);
            16
        }
    }
}

// ---------------------------------------------------------------------------
// Joint indices (u32 output)
// ---------------------------------------------------------------------------

/// Schedules decoding of a JOINTS_0 accessor, widening each channel to u32.
pub(crate) fn schedule_joints_decode<'s>(
    scheduler: &mut JobScheduler<'s>,
    accessor: ResolvedAccessor<'s>,
    writer: StridedWriter,
) -> Result<JobHandle, String> {
    if accessor.element_type != ElementType::Vec4 {
        return Err(format!(
            "joint accessor must be VEC4, got {:?}",
            accessor.element_type
        ));
    }
    if !accessor.component_type.is_index() {
        return Err(format!(
            "joint accessor component type {:?} is not an unsigned integer",
            accessor.component_type
        ));
    }
    if let Some(sparse) = &accessor.sparse {
        if !sparse.index_type.is_index() {
            return Err(format!(
                "sparse index type {:?} is not an unsigned integer",
                sparse.index_type
            ));
        }
    }

    let dense_handle = accessor.dense.map(|dense| {
        let dense_writer = writer.clone();
        scheduler.spawn(move || run_joints_dense(&accessor, dense, &dense_writer))
    });
    if let Some(sparse) = accessor.sparse {
        let sparse_writer = writer;
        let unit = move || run_joints_sparse(&accessor, sparse, &sparse_writer);
        let handle = match dense_handle {
            Some(dense) => scheduler.spawn_after(unit, &[dense]),
            None => scheduler.spawn(unit),
        };
        return Ok(handle);
    }
    dense_handle.ok_or_else(|| "accessor carries no retrievable data".to_string())
}

fn run_joints_dense(
    accessor: &ResolvedAccessor<'_>,
    dense: DenseSource<'_>,
    writer: &StridedWriter,
) -> Result<(), String> {
    match accessor.component_type {
        ComponentType::UnsignedByte => joints_dense_loop::<u8>(dense, accessor.count, writer),
        ComponentType::UnsignedShort => joints_dense_loop::<u16>(dense, accessor.count, writer),
        ComponentType::UnsignedInt => joints_dense_loop::<u32>(dense, accessor.count, writer),
        other => Err(format!("invalid joint component type {other:?}")),
    }
}

fn joints_dense_loop<T: IndexComponent>(
    dense: DenseSource<'_>,
    count: usize,
    writer: &StridedWriter,
) -> Result<(), String> {
    let elem_bytes = 4 * T::SIZE;
    check_dense_bounds(&dense, count, elem_bytes)?;

    for i in 0..count {
        let base = i * dense.stride;
        let mut joints = [0u32; 4];
        for (c, joint) in joints.iter_mut().enumerate() {
            *joint = T::read(&dense.bytes[base + c * T::SIZE..base + (c + 1) * T::SIZE]).widen();
        }
        writer.write(i, bytemuck::cast_slice(&joints));
    }
    Ok(())
}

fn run_joints_sparse(
    accessor: &ResolvedAccessor<'_>,
    sparse: SparseSource<'_>,
    writer: &StridedWriter,
) -> Result<(), String> {
    match sparse.index_type {
        ComponentType::UnsignedByte => run_joints_sparse_values::<u8>(accessor, sparse, writer),
        ComponentType::UnsignedShort => run_joints_sparse_values::<u16>(accessor, sparse, writer),
        ComponentType::UnsignedInt => run_joints_sparse_values::<u32>(accessor, sparse, writer),
        other => Err(format!("sparse index type {other:?} is not an unsigned integer")),
    }
}

fn run_joints_sparse_values<TI: IndexComponent>(
    accessor: &ResolvedAccessor<'_>,
    sparse: SparseSource<'_>,
    writer: &StridedWriter,
) -> Result<(), String> {
    match accessor.component_type {
        ComponentType::UnsignedByte => joints_sparse_loop::<TI, u8>(sparse, writer),
        ComponentType::UnsignedShort => joints_sparse_loop::<TI, u16>(sparse, writer),
        ComponentType::UnsignedInt => joints_sparse_loop::<TI, u32>(sparse, writer),
        other => Err(format!("invalid joint component type {other:?}")),
    }
}

fn joints_sparse_loop<TI: IndexComponent, TV: IndexComponent>(
    sparse: SparseSource<'_>,
    writer: &StridedWriter,
) -> Result<(), String> {
    let elem_bytes = 4 * TV::SIZE;
    check_sparse_bounds::<TI>(&sparse, elem_bytes)?;

    for k in 0..sparse.count {
        let idx = TI::read(&sparse.indices[k * TI::SIZE..(k + 1) * TI::SIZE]).widen() as usize;
        if idx >= writer.count() {
            return Err(format!(
                "sparse patch index {idx} out of range for {} elements",
                writer.count()
            ));
        }
        let base = k * elem_bytes;
        let mut joints = [0u32; 4];
        for (c, joint) in joints.iter_mut().enumerate() {
            *joint = TV::read(&sparse.values[base + c * TV::SIZE..base + (c + 1) * TV::SIZE]).widen();
        }
        writer.write(idx, bytemuck::cast_slice(&joints));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Index lists (i32 output)
// ---------------------------------------------------------------------------

/// Schedules decoding of an index accessor, widening to signed 32-bit.
///
/// With `flip_winding`, every complete triangle `[a, b, c]` lands in the
/// output as `[a, c, b]`, compensating for the X-mirroring of the geometry.
pub(crate) fn schedule_index_decode<'s>(
    scheduler: &mut JobScheduler<'s>,
    accessor: ResolvedAccessor<'s>,
    flip_winding: bool,
    writer: StridedWriter,
) -> Result<JobHandle, String> {
    if accessor.element_type != ElementType::Scalar {
        return Err(format!(
            "index accessor must be SCALAR, got {:?}",
            accessor.element_type
        ));
    }
    if !accessor.component_type.is_index() {
        return Err(format!(
            "index accessor component type {:?} is not an unsigned integer",
            accessor.component_type
        ));
    }
    if accessor.sparse.is_some() {
        return Err("index accessors must not be sparse".into());
    }
    let dense = accessor
        .dense
        .ok_or_else(|| "index accessor carries no data".to_string())?;

    Ok(scheduler.spawn(move || match accessor.component_type {
        ComponentType::UnsignedByte => index_loop::<u8>(dense, accessor.count, flip_winding, &writer),
        ComponentType::UnsignedShort => {
            index_loop::<u16>(dense, accessor.count, flip_winding, &writer)
        }
        ComponentType::UnsignedInt => index_loop::<u32>(dense, accessor.count, flip_winding, &writer),
        other => Err(format!("invalid index component type {other:?}")),
    }))
}

fn index_loop<T: IndexComponent>(
    dense: DenseSource<'_>,
    count: usize,
    flip_winding: bool,
    writer: &StridedWriter,
) -> Result<(), String> {
    check_dense_bounds(&dense, count, T::SIZE)?;

    for k in 0..count {
        let value = T::read(&dense.bytes[k * dense.stride..k * dense.stride + T::SIZE]).widen() as i32;
        let dst = if flip_winding { flipped_position(k, count) } else { k };
        writer.write(dst, &value.to_le_bytes());
    }
    Ok(())
}

/// Output position of source index `k` under per-triangle winding flip.
///
/// A trailing partial triple keeps its order.
pub(crate) fn flipped_position(k: usize, count: usize) -> usize {
    let base = k - k % 3;
    if base + 3 > count {
        return k;
    }
    match k % 3 {
        1 => k + 1,
        2 => k - 1,
        _ => k,
    }
}

// ---------------------------------------------------------------------------
// Shared checks and conversions
// ---------------------------------------------------------------------------

fn check_dense_bounds(dense: &DenseSource<'_>, count: usize, elem_bytes: usize) -> Result<(), String> {
    if count == 0 {
        return Ok(());
    }
    let end = (count - 1) * dense.stride + elem_bytes;
    if end > dense.bytes.len() {
        return Err(format!(
            "accessor data out of bounds: need {end} bytes, have {}",
            dense.bytes.len()
        ));
    }
    Ok(())
}

fn check_sparse_bounds<TI: IndexComponent>(
    sparse: &SparseSource<'_>,
    elem_bytes: usize,
) -> Result<(), String> {
    if sparse.count * TI::SIZE > sparse.indices.len() {
        return Err("sparse index data out of bounds".into());
    }
    if sparse.count * elem_bytes > sparse.values.len() {
        return Err("sparse value data out of bounds".into());
    }
    Ok(())
}

/// Reinterprets little-endian output bytes as f32 values.
pub(crate) fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Reinterprets little-endian output bytes as i32 values.
pub(crate) fn bytes_to_i32(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_accessor<'a>(
        bytes: &'a [u8],
        stride: usize,
        component_type: ComponentType,
        element_type: ElementType,
        count: usize,
        normalized: bool,
    ) -> ResolvedAccessor<'a> {
        ResolvedAccessor {
            component_type,
            element_type,
            count,
            normalized,
            dense: Some(DenseSource { bytes, stride }),
            sparse: None,
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn decode_indices(raw: &[u8], component_type: ComponentType, flip: bool) -> Vec<i32> {
        let count = raw.len() / component_type.byte_size();
        let accessor = dense_accessor(
            raw,
            component_type.byte_size(),
            component_type,
            ElementType::Scalar,
            count,
            false,
        );
        let buffer = OutputBuffer::new(count * 4);
        let writer = unsafe { buffer.writer(0, 4, 4, count) };
        let mut scheduler = JobScheduler::new();
        let handle = schedule_index_decode(&mut scheduler, accessor, flip, writer).unwrap();
        scheduler.dispatch();
        assert!(!scheduler.is_failed(handle));
        bytes_to_i32(&buffer.into_vec().unwrap())
    }

    #[test]
    fn normalized_signed_byte_bounds() {
        let raw: Vec<u8> = vec![0x80, 0x81, 0xFF, 0x00, 0x7F, 0x01, 0x40, 0xC0];
        let accessor = dense_accessor(
            &raw,
            1,
            ComponentType::Byte,
            ElementType::Scalar,
            raw.len(),
            true,
        );
        let values = read_floats(&accessor, FloatTarget::Scalar).unwrap();
        // The type minimum decodes to exactly -1.0, not below it.
        assert_eq!(values[0], -1.0);
        for v in &values {
            assert!(*v >= -1.0 && *v <= 1.0);
        }
        assert_eq!(values[4], 1.0);
    }

    #[test]
    fn normalized_short_minimum_clamps() {
        let raw = i16::MIN.to_le_bytes();
        let accessor = dense_accessor(&raw, 2, ComponentType::Short, ElementType::Scalar, 1, true);
        let values = read_floats(&accessor, FloatTarget::Scalar).unwrap();
        assert_eq!(values[0], -1.0);
    }

    #[test]
    fn normalized_unsigned_bounds() {
        let raw = vec![0u8, 128, 255];
        let accessor = dense_accessor(
            &raw,
            1,
            ComponentType::UnsignedByte,
            ElementType::Scalar,
            3,
            true,
        );
        let values = read_floats(&accessor, FloatTarget::Scalar).unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[2], 1.0);
        for v in &values {
            assert!(*v >= 0.0 && *v <= 1.0);
        }
    }

    #[test]
    fn normalized_float_is_rejected() {
        let raw = f32_bytes(&[1.0]);
        let accessor = dense_accessor(&raw, 4, ComponentType::Float, ElementType::Scalar, 1, true);
        assert!(read_floats(&accessor, FloatTarget::Scalar).is_err());
    }

    #[test]
    fn packed_and_explicit_stride_match() {
        let raw = f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let packed = dense_accessor(&raw, 12, ComponentType::Float, ElementType::Vec3, 2, false);
        // Stride 12 is exactly componentSize * componentCount, i.e. what a
        // zero byteStride defaults to.
        let explicit = dense_accessor(&raw, 12, ComponentType::Float, ElementType::Vec3, 2, false);
        let a = read_floats(&packed, FloatTarget::Vec3).unwrap();
        let b = read_floats(&explicit, FloatTarget::Vec3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn interleaved_stride_skips_other_attributes() {
        // Two vec3 positions interleaved with a vec3 normal at stride 24.
        let raw = f32_bytes(&[
            1.0, 2.0, 3.0, 9.0, 9.0, 9.0, //
            4.0, 5.0, 6.0, 8.0, 8.0, 8.0,
        ]);
        let accessor = dense_accessor(&raw, 24, ComponentType::Float, ElementType::Vec3, 2, false);
        let values = read_floats(&accessor, FloatTarget::Vec3).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn mirrored_vec3_negates_x() {
        let raw = f32_bytes(&[1.0, 2.0, 3.0]);
        let accessor = dense_accessor(&raw, 12, ComponentType::Float, ElementType::Vec3, 1, false);
        let values = read_floats(&accessor, FloatTarget::MirroredVec3).unwrap();
        assert_eq!(values, vec![-1.0, 2.0, 3.0]);
    }

    #[test]
    fn sparse_overlay_patches_dense() {
        // Dense [(0,0,0),(1,1,1),(2,2,2),(3,3,3)], patch indices [1,3] with
        // [(9,9,9),(8,8,8)].
        let dense = f32_bytes(&[
            0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0,
        ]);
        let indices: Vec<u8> = [1u16, 3u16].iter().flat_map(|v| v.to_le_bytes()).collect();
        let values = f32_bytes(&[9.0, 9.0, 9.0, 8.0, 8.0, 8.0]);

        let accessor = ResolvedAccessor {
            component_type: ComponentType::Float,
            element_type: ElementType::Vec3,
            count: 4,
            normalized: false,
            dense: Some(DenseSource {
                bytes: &dense,
                stride: 12,
            }),
            sparse: Some(SparseSource {
                count: 2,
                index_type: ComponentType::UnsignedShort,
                indices: &indices,
                values: &values,
            }),
        };
        let out = read_floats(&accessor, FloatTarget::Vec3).unwrap();
        assert_eq!(
            out,
            vec![0.0, 0.0, 0.0, 9.0, 9.0, 9.0, 2.0, 2.0, 2.0, 8.0, 8.0, 8.0]
        );
    }

    #[test]
    fn pure_sparse_fills_zeroed_base() {
        let indices = [2u8];
        let values = f32_bytes(&[7.0]);
        let accessor = ResolvedAccessor {
            component_type: ComponentType::Float,
            element_type: ElementType::Scalar,
            count: 4,
            normalized: false,
            dense: None,
            sparse: Some(SparseSource {
                count: 1,
                index_type: ComponentType::UnsignedByte,
                indices: &indices,
                values: &values,
            }),
        };
        let out = read_floats(&accessor, FloatTarget::Scalar).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn sparse_index_out_of_range_fails() {
        let indices = [9u8];
        let values = f32_bytes(&[7.0]);
        let accessor = ResolvedAccessor {
            component_type: ComponentType::Float,
            element_type: ElementType::Scalar,
            count: 4,
            normalized: false,
            dense: None,
            sparse: Some(SparseSource {
                count: 1,
                index_type: ComponentType::UnsignedByte,
                indices: &indices,
                values: &values,
            }),
        };
        assert!(read_floats(&accessor, FloatTarget::Scalar).is_err());
    }

    #[test]
    fn no_data_accessor_fails() {
        let accessor = ResolvedAccessor {
            component_type: ComponentType::Float,
            element_type: ElementType::Vec3,
            count: 4,
            normalized: false,
            dense: None,
            sparse: None,
        };
        assert!(read_floats(&accessor, FloatTarget::Vec3).is_err());
    }

    #[test]
    fn rgb_color_gains_alpha() {
        let raw = f32_bytes(&[0.5, 0.25, 0.125]);
        let accessor = dense_accessor(&raw, 12, ComponentType::Float, ElementType::Vec3, 1, false);
        let values = read_floats(&accessor, FloatTarget::ColorRgba).unwrap();
        assert_eq!(values, vec![0.5, 0.25, 0.125, 1.0]);
    }

    #[test]
    fn normalized_u16_color_keeps_alpha() {
        let raw: Vec<u8> = [65535u16, 0, 32767, 65535]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let accessor = dense_accessor(
            &raw,
            8,
            ComponentType::UnsignedShort,
            ElementType::Vec4,
            1,
            true,
        );
        let values = read_floats(&accessor, FloatTarget::ColorRgba).unwrap();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[3], 1.0);
    }

    #[test]
    fn quat_mirror_negates_y_z() {
        let raw = f32_bytes(&[0.1, 0.2, 0.3, 0.9]);
        let accessor = dense_accessor(&raw, 16, ComponentType::Float, ElementType::Vec4, 1, false);
        let values = read_floats(&accessor, FloatTarget::MirroredQuat).unwrap();
        assert_eq!(values, vec![0.1, -0.2, -0.3, 0.9]);
    }

    #[test]
    fn integer_quat_is_renormalized() {
        // Normalized i16 quaternion close to identity; after mirroring the
        // result must be unit length.
        let raw: Vec<u8> = [0i16, 0, 0, i16::MAX]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let accessor = dense_accessor(&raw, 8, ComponentType::Short, ElementType::Vec4, 1, true);
        let values = read_floats(&accessor, FloatTarget::MirroredQuat).unwrap();
        let len: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mat4_similarity_transform() {
        // Identity with translation (1, 2, 3): X translation flips sign.
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            1.0, 2.0, 3.0, 1.0,
        ];
        let raw = f32_bytes(&m);
        let accessor = dense_accessor(&raw, 64, ComponentType::Float, ElementType::Mat4, 1, false);
        let values = read_floats(&accessor, FloatTarget::MirroredMat4).unwrap();
        assert_eq!(values[12], -1.0);
        assert_eq!(values[13], 2.0);
        assert_eq!(values[14], 3.0);
    }

    #[test]
    fn index_widening_preserves_values() {
        assert_eq!(
            decode_indices(&[0, 1, 2, 255], ComponentType::UnsignedByte, false),
            vec![0, 1, 2, 255]
        );
    }

    #[test]
    fn index_winding_flip() {
        assert_eq!(
            decode_indices(&[0, 1, 2], ComponentType::UnsignedByte, true),
            vec![0, 2, 1]
        );
        assert_eq!(
            decode_indices(&[0, 1, 2, 3, 4, 5], ComponentType::UnsignedByte, true),
            vec![0, 2, 1, 3, 5, 4]
        );
    }

    #[test]
    fn index_u16_and_u32_widen() {
        let raw: Vec<u8> = [700u16, 65535].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(
            decode_indices(&raw, ComponentType::UnsignedShort, false),
            vec![700, 65535]
        );
        let raw: Vec<u8> = [1_000_000u32].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(
            decode_indices(&raw, ComponentType::UnsignedInt, false),
            vec![1_000_000]
        );
    }

    #[test]
    fn partial_triple_keeps_order() {
        assert_eq!(
            decode_indices(&[0, 1, 2, 3, 4], ComponentType::UnsignedByte, true),
            vec![0, 2, 1, 3, 4]
        );
    }

    #[test]
    fn float_index_source_rejected() {
        let raw = f32_bytes(&[0.0]);
        let accessor = dense_accessor(&raw, 4, ComponentType::Float, ElementType::Scalar, 1, false);
        let buffer = OutputBuffer::new(4);
        let writer = unsafe { buffer.writer(0, 4, 4, 1) };
        let mut scheduler = JobScheduler::new();
        assert!(schedule_index_decode(&mut scheduler, accessor, false, writer).is_err());
    }

    #[test]
    fn dense_bounds_error_is_reported() {
        let raw = f32_bytes(&[1.0, 2.0]);
        let accessor = dense_accessor(&raw, 12, ComponentType::Float, ElementType::Vec3, 2, false);
        assert!(read_floats(&accessor, FloatTarget::Vec3).is_err());
    }

    #[test]
    fn component_type_table() {
        assert_eq!(ComponentType::from_gltf(5120), Some(ComponentType::Byte));
        assert_eq!(ComponentType::from_gltf(5126), Some(ComponentType::Float));
        assert_eq!(ComponentType::from_gltf(5124), None);
        assert_eq!(ComponentType::Byte.byte_size(), 1);
        assert_eq!(ComponentType::UnsignedShort.byte_size(), 2);
        assert_eq!(ComponentType::Float.byte_size(), 4);
    }

    #[test]
    fn element_type_table() {
        assert_eq!(ElementType::from_gltf("SCALAR"), Some(ElementType::Scalar));
        assert_eq!(ElementType::from_gltf("MAT4"), Some(ElementType::Mat4));
        assert_eq!(ElementType::from_gltf("vec3"), None);
        assert_eq!(ElementType::Mat3.component_count(), 9);
    }

    #[test]
    fn scheduled_decode_orders_dense_before_sparse() {
        let dense = f32_bytes(&[1.0, 2.0, 3.0, 4.0]);
        let indices = [0u8];
        let values = f32_bytes(&[9.0]);
        let accessor = ResolvedAccessor {
            component_type: ComponentType::Float,
            element_type: ElementType::Scalar,
            count: 4,
            normalized: false,
            dense: Some(DenseSource {
                bytes: &dense,
                stride: 4,
            }),
            sparse: Some(SparseSource {
                count: 1,
                index_type: ComponentType::UnsignedByte,
                indices: &indices,
                values: &values,
            }),
        };

        let buffer = OutputBuffer::new(16);
        let writer = unsafe { buffer.writer(0, 4, 4, 4) };
        let mut scheduler = JobScheduler::new();
        let handle = schedule_float_decode(&mut scheduler, accessor, FloatTarget::Scalar, writer)
            .unwrap();

        // Dense batch, then sparse batch.
        assert_eq!(scheduler.dispatch(), 1);
        assert!(!scheduler.is_done(handle));
        assert_eq!(scheduler.dispatch(), 1);
        assert!(scheduler.is_done(handle));

        let out = bytes_to_f32(&buffer.into_vec().unwrap());
        assert_eq!(out, vec![9.0, 2.0, 3.0, 4.0]);
    }
}
