use log::debug;
use pasture_core::nalgebra::{Matrix2, SymmetricEigen, Vector2};

use crate::{
    config::ShapeThresholds,
    grid::GridGeometry,
    raster::{CellMask, Raster},
};

/// Components with fewer cells than this are discarded without shape analysis
pub const MIN_COMPONENT_CELLS: usize = 4;
/// Floor for covariance eigenvalues, so that collinear components get a tiny but positive width
pub const EIGENVALUE_FLOOR: f64 = 1e-12;
/// Floor for the width in the elongation ratio
pub const WIDTH_FLOOR: f64 = 1e-6;

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Principal-axis description of a set of cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDescriptor {
    pub centroid: Vector2<f64>,
    /// `2 * sqrt(l2)` with `l2` the larger covariance eigenvalue
    pub length: f64,
    /// `2 * sqrt(l1)` with `l1` the smaller covariance eigenvalue
    pub width: f64,
}

impl ShapeDescriptor {
    pub fn elongation(&self) -> f64 {
        self.length / self.width.max(WIDTH_FLOOR)
    }

    /// Returns `true` if this shape is long, narrow and elongated enough. All bounds are inclusive
    pub fn matches(&self, thresholds: &ShapeThresholds) -> bool {
        self.length >= thresholds.min_len
            && self.width >= thresholds.min_width
            && self.width <= thresholds.max_width
            && self.elongation() >= thresholds.min_elong
    }
}

/// Outcome of the component shape filter
#[derive(Debug, Clone)]
pub struct ComponentFilterResult {
    /// Cells of all accepted components
    pub keep: CellMask,
    pub accepted: usize,
}

/// Labels the 8-connected components of `mask`. Each component is returned as the list of the
/// row-major indices of its cells. Uses an explicit stack, so the depth of a component does not
/// affect the call stack.
pub fn connected_components(mask: &CellMask) -> Vec<Vec<usize>> {
    let width = mask.width() as isize;
    let height = mask.height() as isize;
    let cells = mask.as_slice();
    let mut seen = vec![false; cells.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..cells.len() {
        if !cells[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut component = Vec::new();
        while let Some(current) = stack.pop() {
            component.push(current);
            let col = (current % mask.width()) as isize;
            let row = (current / mask.width()) as isize;
            for (dx, dy) in NEIGHBOURS.iter() {
                let (nx, ny) = (col + dx, row + dy);
                if nx < 0 || ny < 0 || nx >= width || ny >= height {
                    continue;
                }
                let neighbour = (ny * width + nx) as usize;
                if cells[neighbour] && !seen[neighbour] {
                    seen[neighbour] = true;
                    stack.push(neighbour);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Computes centroid and principal extents of the given cells from the covariance of their centers.
/// The covariance uses the unbiased `1 / (n - 1)` normalization. Returns `None` for fewer than two cells
pub fn shape_of(cells: &[usize], geometry: &GridGeometry) -> Option<ShapeDescriptor> {
    if cells.len() < 2 {
        return None;
    }
    let centers: Vec<Vector2<f64>> = cells
        .iter()
        .map(|cell| geometry.cell_center_at(*cell))
        .collect();
    let centroid = centers.iter().sum::<Vector2<f64>>() / centers.len() as f64;

    let mut covariance = Matrix2::<f64>::zeros();
    for center in centers.iter() {
        let diff = center - centroid;
        covariance += diff * diff.transpose();
    }
    covariance /= (centers.len() - 1) as f64;

    let eigenvalues = SymmetricEigen::new(covariance).eigenvalues;
    let smaller = eigenvalues[0].min(eigenvalues[1]);
    let larger = eigenvalues[0].max(eigenvalues[1]);
    Some(ShapeDescriptor {
        centroid,
        length: 2.0 * larger.max(EIGENVALUE_FLOOR).sqrt(),
        width: 2.0 * smaller.max(EIGENVALUE_FLOOR).sqrt(),
    })
}

/// Keeps the connected components of `candidates` whose shape matches `thresholds`. Components with
/// fewer than [`MIN_COMPONENT_CELLS`] cells are discarded.
pub fn filter_components(
    candidates: &CellMask,
    geometry: &GridGeometry,
    thresholds: &ShapeThresholds,
) -> ComponentFilterResult {
    let mut keep = Raster::filled(candidates.width(), candidates.height(), false);
    let mut accepted = 0;
    for component in connected_components(candidates) {
        if component.len() < MIN_COMPONENT_CELLS {
            continue;
        }
        let shape = match shape_of(&component, geometry) {
            Some(shape) => shape,
            None => continue,
        };
        if !shape.matches(thresholds) {
            debug!(
                "Rejected component of {} cells (length {:.2}, width {:.2})",
                component.len(),
                shape.length,
                shape.width
            );
            continue;
        }
        for cell in component {
            keep.as_mut_slice()[cell] = true;
        }
        accepted += 1;
    }
    ComponentFilterResult { keep, accepted }
}
