use anyhow::{anyhow, bail, Result};
use float_ord::FloatOrd;
use pasture_core::nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

use crate::{
    bounds::{calculate_bounds, is_finite},
    raster::{HeightLayer, Raster},
};

/// Placement of the horizontal grid. Cell (`col`, `row`) covers the half-open interval
/// `[origin.x + col * cell_size, origin.x + (col + 1) * cell_size)` in x and the analogous
/// interval in y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub cell_size: f64,
    pub origin: Vector2<f64>,
    pub width: usize,
    pub height: usize,
}

impl GridGeometry {
    /// Creates the geometry that covers the horizontal extent between `min` and `max` with at least
    /// one cell of margin
    pub fn covering(min: Vector2<f64>, max: Vector2<f64>, cell_size: f64) -> Self {
        let width = ((max.x - min.x) / cell_size).ceil() as usize + 1;
        let height = ((max.y - min.y) / cell_size).ceil() as usize + 1;
        Self {
            cell_size,
            origin: min,
            width,
            height,
        }
    }

    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }

    /// The cell that contains (`x`, `y`), or `None` if the position lies outside of the grid
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.origin.x) / self.cell_size).floor();
        let row = ((y - self.origin.y) / self.cell_size).floor();
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some((col, row))
    }

    /// Like `cell_of`, but clamps positions outside of the grid to the nearest border cell
    pub fn clamped_cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        let col = ((x - self.origin.x) / self.cell_size).floor().max(0.0) as usize;
        let row = ((y - self.origin.y) / self.cell_size).floor().max(0.0) as usize;
        (col.min(self.width - 1), row.min(self.height - 1))
    }

    /// Physical center of the cell at (`col`, `row`)
    pub fn cell_center(&self, col: usize, row: usize) -> Vector2<f64> {
        Vector2::new(
            self.origin.x + (col as f64 + 0.5) * self.cell_size,
            self.origin.y + (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Physical center of the cell with the given row-major index
    pub fn cell_center_at(&self, index: usize) -> Vector2<f64> {
        self.cell_center(index % self.width, index / self.width)
    }
}

/// A 2.5D height grid: per cell, a low and a high quantile of the point heights and the number of points
#[derive(Debug, Clone)]
pub struct HeightGrid {
    pub geometry: GridGeometry,
    pub z_low: HeightLayer,
    pub z_high: HeightLayer,
    pub count: Raster<u32>,
}

/// Computes the `q`-quantile of the ascending `sorted` values, linearly interpolating between the two
/// closest order statistics. Returns `None` for an empty slice
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Bins `positions` into a horizontal grid with cells of size `cell_size` and computes the `q_low` and
/// `q_high` quantiles of the heights per cell.
///
/// The grid origin is the minimum x/y of the input. Positions with non-finite coordinates take no part
/// in the grid. Cells without points stay empty in both height layers.
///
/// # Errors
///
/// If `positions` contains no finite position, or the parameters are out of range
///
/// # Examples
///
/// ```
/// # use declutter_algorithms::grid::build_height_grid;
/// # use pasture_core::nalgebra::Vector3;
/// let positions = vec![
///     Vector3::new(0.0, 0.0, 1.0),
///     Vector3::new(0.1, 0.1, 3.0),
///     Vector3::new(2.0, 0.0, 5.0),
/// ];
/// let grid = build_height_grid(&positions, 1.0, 0.0, 1.0).unwrap();
/// assert_eq!(3, grid.geometry.width);
/// assert_eq!(Some(1.0), *grid.z_low.at(0, 0));
/// assert_eq!(Some(3.0), *grid.z_high.at(0, 0));
/// assert_eq!(None, *grid.z_low.at(1, 0));
/// ```
pub fn build_height_grid(
    positions: &[Vector3<f64>],
    cell_size: f64,
    q_low: f64,
    q_high: f64,
) -> Result<HeightGrid> {
    if positions.is_empty() {
        bail!("Point cloud is empty");
    }
    if !(cell_size.is_finite() && cell_size > 0.0) {
        bail!("Cell size must be a positive number, got {}", cell_size);
    }
    if !(0.0 <= q_low && q_low < q_high && q_high <= 1.0) {
        bail!(
            "Quantiles must satisfy 0 <= q_low < q_high <= 1, got {} and {}",
            q_low,
            q_high
        );
    }

    let bounds = calculate_bounds(positions)
        .ok_or_else(|| anyhow!("Point cloud contains no finite points"))?;
    let geometry = GridGeometry::covering(
        Vector2::new(bounds.min().x, bounds.min().y),
        Vector2::new(bounds.max().x, bounds.max().y),
        cell_size,
    );

    // sort (cell, z) pairs so that every cell forms one contiguous run of ascending heights
    let mut binned: Vec<(usize, FloatOrd<f64>)> = positions
        .iter()
        .filter(|p| is_finite(p))
        .map(|p| {
            let (col, row) = geometry.clamped_cell_of(p.x, p.y);
            (row * geometry.width + col, FloatOrd(p.z))
        })
        .collect();
    binned.par_sort_unstable();
    let heights: Vec<f64> = binned.iter().map(|(_, z)| z.0).collect();

    let mut runs = Vec::new();
    let mut start = 0;
    for end in 1..=binned.len() {
        if end == binned.len() || binned[end].0 != binned[start].0 {
            runs.push((binned[start].0, start..end));
            start = end;
        }
    }

    let cell_stats: Vec<(usize, f64, f64, u32)> = runs
        .into_par_iter()
        .filter_map(|(cell, range)| {
            let sorted = &heights[range];
            let low = quantile_sorted(sorted, q_low)?;
            let high = quantile_sorted(sorted, q_high)?;
            Some((cell, low, high, sorted.len() as u32))
        })
        .collect();

    let mut z_low = Raster::filled(geometry.width, geometry.height, None);
    let mut z_high = Raster::filled(geometry.width, geometry.height, None);
    let mut count = Raster::filled(geometry.width, geometry.height, 0u32);
    for (cell, low, high, num_points) in cell_stats {
        z_low.as_mut_slice()[cell] = Some(low);
        z_high.as_mut_slice()[cell] = Some(high);
        count.as_mut_slice()[cell] = num_points;
    }

    Ok(HeightGrid {
        geometry,
        z_low,
        z_high,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_approx_eq!(1.0, quantile_sorted(&values, 0.0).unwrap());
        assert_approx_eq!(5.0, quantile_sorted(&values, 1.0).unwrap());
        assert_approx_eq!(3.0, quantile_sorted(&values, 0.5).unwrap());
        assert_approx_eq!(4.6, quantile_sorted(&values, 0.9).unwrap());
        assert_approx_eq!(1.08, quantile_sorted(&values, 0.02).unwrap());
        assert_approx_eq!(7.0, quantile_sorted(&[7.0], 0.3).unwrap());
        assert!(quantile_sorted(&[], 0.5).is_none());
    }

    #[test]
    fn test_empty_input_fails() {
        let err = build_height_grid(&[], 0.35, 0.02, 0.9).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_only_non_finite_input_fails() {
        let positions = vec![Vector3::new(f64::NAN, 0.0, 0.0)];
        assert!(build_height_grid(&positions, 0.35, 0.02, 0.9).is_err());
    }

    #[test]
    fn test_grid_covers_all_points() {
        let mut rng = StdRng::seed_from_u64(7);
        let positions: Vec<_> = (0..2000)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(-13.0..27.0),
                    rng.gen_range(4.0..9.5),
                    rng.gen_range(-1.0..1.0),
                )
            })
            .collect();
        let grid = build_height_grid(&positions, 0.35, 0.02, 0.9).unwrap();
        let total: u32 = grid.count.as_slice().iter().sum();
        assert_eq!(positions.len() as u32, total);
        for p in positions.iter() {
            assert!(grid.geometry.cell_of(p.x, p.y).is_some());
        }
    }

    #[test]
    fn test_low_quantile_never_exceeds_high_quantile() {
        let mut rng = StdRng::seed_from_u64(11);
        let positions: Vec<_> = (0..5000)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(-5.0..5.0),
                )
            })
            .collect();
        let grid = build_height_grid(&positions, 0.5, 0.02, 0.9).unwrap();
        for (low, high) in grid
            .z_low
            .as_slice()
            .iter()
            .zip(grid.z_high.as_slice().iter())
        {
            match (low, high) {
                (Some(low), Some(high)) => assert!(low <= high),
                (None, None) => {}
                _ => panic!("Both layers must agree on empty cells"),
            }
        }
    }

    #[test]
    fn test_grid_is_order_independent() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut positions: Vec<_> = (0..500)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(0.0..3.0),
                    rng.gen_range(0.0..3.0),
                    rng.gen_range(0.0..1.0),
                )
            })
            .collect();
        let forward = build_height_grid(&positions, 0.35, 0.02, 0.9).unwrap();
        positions.reverse();
        let backward = build_height_grid(&positions, 0.35, 0.02, 0.9).unwrap();
        assert_eq!(forward.z_low, backward.z_low);
        assert_eq!(forward.z_high, backward.z_high);
        assert_eq!(forward.count, backward.count);
    }

    #[test]
    fn test_cell_of_rejects_outside_positions() {
        let geometry = GridGeometry::covering(Vector2::new(0.0, 0.0), Vector2::new(1.0, 1.0), 0.5);
        assert_eq!(3, geometry.width);
        assert_eq!(3, geometry.height);
        assert_eq!(Some((2, 0)), geometry.cell_of(1.0, 0.0));
        assert_eq!(None, geometry.cell_of(-0.01, 0.0));
        assert_eq!(None, geometry.cell_of(0.0, 1.6));
        assert_eq!(None, geometry.cell_of(f64::NAN, 0.0));
        assert_eq!((0, 2), geometry.clamped_cell_of(-3.0, 9.0));
        assert_approx_eq!(0.75, geometry.cell_center(1, 0).x);
        assert_approx_eq!(1.25, geometry.cell_center_at(7).y);
    }
}
