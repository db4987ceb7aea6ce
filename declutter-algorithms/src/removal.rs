use log::warn;
use pasture_core::nalgebra::Vector3;

use crate::{
    bounds::is_finite,
    grid::GridGeometry,
    raster::{CellMask, HeightLayer},
};

/// Partition of the input points into kept and removed points
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// One flag per input point, `true` if the point is removed
    pub removed: Vec<bool>,
    /// Indices of all removed points, ascending
    pub removed_indices: Vec<usize>,
    /// Indices of all kept points, ascending. Non-finite points are neither kept nor removed
    pub kept_indices: Vec<usize>,
    pub dropped_non_finite: usize,
}

/// Height of `position` above the smoothed ground of its cell. `None` if the position lies outside of
/// the grid or the ground of its cell is undefined
pub fn height_above_ground(
    position: &Vector3<f64>,
    geometry: &GridGeometry,
    z_ground: &HeightLayer,
) -> Option<f64> {
    let (col, row) = geometry.cell_of(position.x, position.y)?;
    z_ground.at(col, row).map(|ground| position.z - ground)
}

/// Maps every position onto its grid cell and removes it if the cell is set in `keep` and the point's own
/// height above the smoothed ground lies within `[h_min, h_max]`.
///
/// The point-level height check is applied on top of the cell-level classification: a flagged cell may
/// still contain points (e.g. ground returns below a cable) that are not clutter. Positions outside of the
/// grid are never removed. Non-finite positions are dropped from the kept set with a warning.
pub fn partition_points(
    positions: &[Vector3<f64>],
    geometry: &GridGeometry,
    keep: &CellMask,
    z_ground: &HeightLayer,
    h_min: f64,
    h_max: f64,
) -> Partition {
    let removed: Vec<bool> = positions
        .iter()
        .map(|position| {
            let (col, row) = match geometry.cell_of(position.x, position.y) {
                Some(cell) => cell,
                None => return false,
            };
            if !*keep.at(col, row) {
                return false;
            }
            match height_above_ground(position, geometry, z_ground) {
                Some(h) => h >= h_min && h <= h_max,
                None => false,
            }
        })
        .collect();

    let mut removed_indices = Vec::new();
    let mut kept_indices = Vec::new();
    let mut dropped_non_finite = 0;
    for (index, (position, is_removed)) in positions.iter().zip(removed.iter()).enumerate() {
        if *is_removed {
            removed_indices.push(index);
        } else if is_finite(position) {
            kept_indices.push(index);
        } else {
            dropped_non_finite += 1;
        }
    }
    if dropped_non_finite > 0 {
        warn!(
            "Dropping {} non-finite points from the kept points",
            dropped_non_finite
        );
    }

    Partition {
        removed,
        removed_indices,
        kept_indices,
        dropped_non_finite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use pasture_core::nalgebra::Vector2;

    fn setup() -> (GridGeometry, CellMask, HeightLayer) {
        let geometry = GridGeometry {
            cell_size: 1.0,
            origin: Vector2::new(0.0, 0.0),
            width: 3,
            height: 1,
        };
        let keep = Raster::from_vec(3, 1, vec![true, false, true]);
        let z_ground = Raster::from_vec(3, 1, vec![Some(0.0), Some(0.0), None]);
        (geometry, keep, z_ground)
    }

    #[test]
    fn test_point_level_height_check() {
        let (geometry, keep, z_ground) = setup();
        let positions = vec![
            Vector3::new(0.5, 0.5, 0.5),  // flagged cell, in height range
            Vector3::new(0.5, 0.5, 0.05), // flagged cell, ground return
            Vector3::new(0.5, 0.5, 3.5),  // flagged cell, too high
            Vector3::new(1.5, 0.5, 0.5),  // cell not flagged
            Vector3::new(2.5, 0.5, 0.5),  // flagged cell without ground
            Vector3::new(5.0, 0.5, 0.5),  // outside of the grid
        ];
        let partition = partition_points(&positions, &geometry, &keep, &z_ground, 0.2, 3.0);
        assert_eq!(vec![0], partition.removed_indices);
        assert_eq!(vec![1, 2, 3, 4, 5], partition.kept_indices);
        assert_eq!(0, partition.dropped_non_finite);
    }

    #[test]
    fn test_height_range_is_inclusive() {
        let (geometry, keep, z_ground) = setup();
        let positions = vec![Vector3::new(0.5, 0.5, 0.25), Vector3::new(0.5, 0.5, 3.0)];
        let partition = partition_points(&positions, &geometry, &keep, &z_ground, 0.25, 3.0);
        assert_eq!(vec![0, 1], partition.removed_indices);
    }

    #[test]
    fn test_non_finite_points_are_dropped() {
        let (geometry, keep, z_ground) = setup();
        let positions = vec![
            Vector3::new(0.5, 0.5, f64::NAN),
            Vector3::new(f64::INFINITY, 0.5, 0.0),
            Vector3::new(1.5, 0.5, 0.0),
        ];
        let partition = partition_points(&positions, &geometry, &keep, &z_ground, 0.2, 3.0);
        assert!(partition.removed_indices.is_empty());
        assert_eq!(vec![2], partition.kept_indices);
        assert_eq!(2, partition.dropped_non_finite);
    }
}
