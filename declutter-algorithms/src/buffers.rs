use anyhow::{bail, Result};
use pasture_core::{
    containers::{
        BorrowedBuffer, BorrowedBufferExt, InterleavedBufferMut, OwningBuffer, VectorBuffer,
    },
    layout::attributes::POSITION_3D,
    nalgebra::Vector3,
};

use crate::{config::DeclutterConfig, pipeline::remove_clutter, pipeline::DeclutterResult};

/// Extracts the `POSITION_3D` attribute of all points in `buffer`
///
/// # Errors
///
/// If the `PointLayout` of `buffer` has no `POSITION_3D` attribute of type `Vector3<f64>`
pub fn positions_of<'a, B: BorrowedBuffer<'a>>(buffer: &'a B) -> Result<Vec<Vector3<f64>>> {
    if !buffer.point_layout().has_attribute(&POSITION_3D) {
        bail!(
            "The point buffer does not have the attribute POSITION_3D which is needed to find clutter"
        );
    }
    Ok(buffer
        .view_attribute::<Vector3<f64>>(&POSITION_3D)
        .into_iter()
        .collect())
}

/// Copies the points with the given `indices` from `buffer` into a new `VectorBuffer` with the same
/// `PointLayout`, so that all attributes of the points are preserved
pub fn select_points<'a, B: BorrowedBuffer<'a>>(buffer: &'a B, indices: &[usize]) -> VectorBuffer {
    let layout = buffer.point_layout().clone();
    let point_size = layout.size_of_point_entry() as usize;
    let mut selected = VectorBuffer::with_capacity(indices.len(), layout);
    selected.resize(indices.len());
    if indices.is_empty() {
        return selected;
    }
    let target_points = selected.get_point_range_mut(0..indices.len());
    for (index, target_point) in indices.iter().zip(target_points.chunks_exact_mut(point_size)) {
        buffer.get_point(*index, target_point);
    }
    selected
}

/// Point buffers produced by [`remove_clutter_from_buffer`]
pub struct BufferPartition {
    pub kept: VectorBuffer,
    pub removed: VectorBuffer,
    pub result: DeclutterResult,
}

/// Runs the declutter pipeline on the positions of `buffer` and splits the buffer into kept and removed
/// points. Non-finite points end up in neither buffer.
///
/// # Examples
///
/// ```
/// # use declutter_algorithms::{buffers::remove_clutter_from_buffer, config::DeclutterConfig};
/// # use pasture_core::{containers::*, layout::PointType, nalgebra::Vector3};
/// # use pasture_derive::PointType;
/// #[repr(C, packed)]
/// #[derive(PointType, Debug, Clone, Copy, bytemuck::AnyBitPattern, bytemuck::NoUninit)]
/// struct SimplePoint {
///     #[pasture(BUILTIN_POSITION_3D)]
///     pub position: Vector3<f64>,
///     #[pasture(BUILTIN_INTENSITY)]
///     pub intensity: u16,
/// }
/// let mut points = vec![];
/// for x in 0..40 {
///     for y in 0..40 {
///         points.push(SimplePoint {
///             position: Vector3::new(f64::from(x) * 0.1, f64::from(y) * 0.1, 0.0),
///             intensity: 42,
///         });
///     }
/// }
/// let buffer = points.into_iter().collect::<VectorBuffer>();
/// let split = remove_clutter_from_buffer(&buffer, &DeclutterConfig::default()).unwrap();
/// // flat ground contains no clutter
/// assert_eq!(1600, split.kept.len());
/// assert_eq!(0, split.removed.len());
/// ```
pub fn remove_clutter_from_buffer<'a, B: BorrowedBuffer<'a>>(
    buffer: &'a B,
    config: &DeclutterConfig,
) -> Result<BufferPartition> {
    let positions = positions_of(buffer)?;
    let result = remove_clutter(&positions, config)?;
    let kept = select_points(buffer, &result.partition.kept_indices);
    let removed = select_points(buffer, &result.partition.removed_indices);
    Ok(BufferPartition {
        kept,
        removed,
        result,
    })
}
