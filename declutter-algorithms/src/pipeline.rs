use anyhow::{bail, Context, Result};
use log::info;
use pasture_core::nalgebra::Vector3;

use crate::{
    classify::classify_candidates,
    components::filter_components,
    config::DeclutterConfig,
    grid::{build_height_grid, GridGeometry},
    hough::detect_hough_bands,
    morphology::smooth_heights,
    raster::{CellMask, HeightLayer},
    removal::{partition_points, Partition},
    summary::{DeclutterSummary, RemovedOutput},
};

/// Intermediate results that are only collected when `debug_dump` is enabled
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Centers of all cells of the final keep mask, placed at the mean height of the smoothed ground
    pub keep_cell_centers: Vec<Vector3<f64>>,
    pub candidate_cells: usize,
    pub component_cells: usize,
    pub band_cells: usize,
}

/// Result of a declutter run
#[derive(Debug, Clone)]
pub struct DeclutterResult {
    pub partition: Partition,
    pub summary: DeclutterSummary,
    pub diagnostics: Option<Diagnostics>,
}

/// Mean of all defined values of `layer`
fn mean_height(layer: &HeightLayer) -> Option<f64> {
    let (sum, count) = layer
        .as_slice()
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn keep_cell_centers(
    keep: &CellMask,
    geometry: &GridGeometry,
    z_ground: &HeightLayer,
) -> Vec<Vector3<f64>> {
    let z = mean_height(z_ground).unwrap_or(0.0);
    keep.set_indices()
        .into_iter()
        .map(|cell| {
            let center = geometry.cell_center_at(cell);
            Vector3::new(center.x, center.y, z)
        })
        .collect()
}

/// Detects elongated clutter in `positions` and partitions the points into kept and removed points.
///
/// The stages run in this order:
/// 1. Bin the points into a 2D grid with a low and a high height quantile per cell
/// 2. Smooth the low quantile into a ground surface
/// 3. Flag candidate cells by density and height above ground
/// 4. Keep the connected components of candidates that are long, narrow and elongated
/// 5. Optionally add straight bands found with a Hough transform
/// 6. Remove the points in flagged cells whose own height above ground matches
///
/// The run is deterministic: identical input and configuration yield an identical partition and summary.
///
/// # Errors
///
/// If `positions` is empty or contains no finite position, or if `config` is invalid
pub fn remove_clutter(
    positions: &[Vector3<f64>],
    config: &DeclutterConfig,
) -> Result<DeclutterResult> {
    config.validate().context("Invalid declutter configuration")?;
    if positions.is_empty() {
        bail!("Point cloud is empty");
    }

    let grid = build_height_grid(positions, config.grid, config.q_low, config.q_high)?;
    let geometry = grid.geometry;
    info!(
        "Built {}x{} grid with cell size {}",
        geometry.width, geometry.height, geometry.cell_size
    );

    let z_ground = smooth_heights(&grid.z_low, config.smooth_cells);
    let candidates = classify_candidates(
        &grid,
        &z_ground,
        config.density_min,
        config.h_min,
        config.h_max,
    );
    let candidate_cells = candidates.mask.count_set();
    info!("Candidate cells: {}", candidate_cells);

    let components = filter_components(&candidates.mask, &geometry, &config.shape_thresholds());
    info!("Components accepted by shape: {}", components.accepted);
    let component_cells = components.keep.count_set();

    let mut keep = components.keep;
    let mut band_cells = 0;
    if config.use_hough {
        let bands = detect_hough_bands(&geometry, &candidates.mask, &config.hough_params());
        band_cells = bands.count_set();
        info!("Hough bands: {} cells in mask", band_cells);
        keep.union_with(&bands);
    }

    let partition = partition_points(
        positions,
        &geometry,
        &keep,
        &z_ground,
        config.h_min,
        config.h_max,
    );
    info!("Points scheduled for removal: {}", partition.removed_indices.len());

    let diagnostics = if config.debug_dump {
        Some(Diagnostics {
            keep_cell_centers: keep_cell_centers(&keep, &geometry, &z_ground),
            candidate_cells,
            component_cells,
            band_cells,
        })
    } else {
        None
    };

    let summary = DeclutterSummary {
        input_points: positions.len(),
        removed_points: partition.removed_indices.len(),
        kept_points: partition.kept_indices.len(),
        dropped_non_finite: partition.dropped_non_finite,
        components_accepted: components.accepted,
        hough_band_cells: band_cells,
        removed_output: RemovedOutput::NotRequested,
        config: config.clone(),
    };

    Ok(DeclutterResult {
        partition,
        summary,
        diagnostics,
    })
}
