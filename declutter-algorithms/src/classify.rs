use crate::{
    grid::HeightGrid,
    raster::{CellMask, HeightLayer, Raster},
};

/// Result of the candidate classification
#[derive(Debug, Clone)]
pub struct Candidates {
    /// Cells that may contain clutter
    pub mask: CellMask,
    /// Height of the upper quantile above the smoothed ground, empty where either is empty
    pub dh: HeightLayer,
}

/// Flags every cell whose smoothed ground height is known, that contains at least `density_min`
/// points, and whose height above ground `dh = z_high - z_ground` lies within `[h_min, h_max]`.
///
/// # Panics
///
/// If `z_ground` does not have the same shape as the grid
pub fn classify_candidates(
    grid: &HeightGrid,
    z_ground: &HeightLayer,
    density_min: u32,
    h_min: f64,
    h_max: f64,
) -> Candidates {
    assert!(
        grid.z_high.same_shape(z_ground),
        "Ground layer must have the same shape as the grid"
    );
    let width = grid.geometry.width;
    let height = grid.geometry.height;

    let dh: Vec<Option<f64>> = grid
        .z_high
        .as_slice()
        .iter()
        .zip(z_ground.as_slice().iter())
        .map(|(high, ground)| match (high, ground) {
            (Some(high), Some(ground)) => Some(high - ground),
            _ => None,
        })
        .collect();

    let mask: Vec<bool> = dh
        .iter()
        .zip(grid.count.as_slice().iter())
        .map(|(dh, count)| match dh {
            Some(dh) => *count >= density_min && *dh >= h_min && *dh <= h_max,
            None => false,
        })
        .collect();

    Candidates {
        mask: Raster::from_vec(width, height, mask),
        dh: Raster::from_vec(width, height, dh),
    }
}
