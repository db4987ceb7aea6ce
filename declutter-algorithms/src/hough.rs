//! Hough transform over the centers of candidate cells.
//!
//! Every candidate center votes once per discretized angle for the offset `rho = x cos(theta) + y sin(theta)`
//! of the line through it. Strong peaks of the accumulator are validated as physical bands of bounded
//! length and width, and the cells of all accepted bands are returned as a mask. In contrast to the
//! component filter, bands do not need to be connected, so interrupted cables are found as well.

use float_ord::FloatOrd;
use log::{debug, warn};
use pasture_core::nalgebra::Vector2;
use rayon::prelude::*;

use crate::{
    config::HoughParams,
    grid::{quantile_sorted, GridGeometry},
    morphology::dilate,
    raster::{CellMask, Raster},
};

/// Below this number of candidate cells the vote is too unstable and no bands are searched
pub const MIN_CANDIDATE_CELLS: usize = 40;
/// Absolute lower bound on the votes of an accepted peak
pub const MIN_PEAK_VOTES: u32 = 20;
/// Peaks need at least this fraction of the global maximum of votes
pub const RELATIVE_PEAK_VOTES: f64 = 0.25;
/// Neighbourhood around an accepted peak, in angle and offset bins, that is excluded from further peaks
pub const SUPPRESS_THETA_BINS: usize = 1;
pub const SUPPRESS_RHO_BINS: usize = 3;
/// Minimum number of candidate cells within the band of a peak
pub const MIN_BAND_CELLS: usize = 30;
/// Quantile of the distances to the line that estimates the half width of a band
pub const WIDTH_QUANTILE: f64 = 0.9;

/// One line hypothesis of the accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoughPeak {
    pub theta_index: usize,
    pub rho_index: usize,
    pub votes: u32,
}

/// Vote table over (angle, offset) bins, stored row-major with one row per angle
#[derive(Debug, Clone)]
pub struct Accumulator {
    thetas: Vec<f64>,
    rho_min: f64,
    rho_bin: f64,
    num_rho: usize,
    votes: Vec<u32>,
}

impl Accumulator {
    /// Casts one vote per (center, angle) pair
    pub fn vote(centers: &[Vector2<f64>], theta_step_deg: f64, rho_bin: f64) -> Self {
        let thetas = angle_bins(theta_step_deg);
        let (rho_min, rho_max) = rho_range(centers, &thetas);
        let num_rho = (((rho_max - rho_min) / rho_bin).ceil() as usize + 1).max(1);

        let mut votes = vec![0u32; thetas.len() * num_rho];
        votes
            .par_chunks_mut(num_rho)
            .zip(thetas.par_iter())
            .for_each(|(row, theta)| {
                let (sin, cos) = theta.sin_cos();
                for center in centers {
                    let rho = center.x * cos + center.y * sin;
                    let rho_index = ((rho - rho_min) / rho_bin).floor().max(0.0) as usize;
                    row[rho_index.min(num_rho - 1)] += 1;
                }
            });

        Self {
            thetas,
            rho_min,
            rho_bin,
            num_rho,
            votes,
        }
    }

    pub fn num_theta(&self) -> usize {
        self.thetas.len()
    }

    pub fn num_rho(&self) -> usize {
        self.num_rho
    }

    /// Angle of the given bin in radians
    pub fn theta(&self, theta_index: usize) -> f64 {
        self.thetas[theta_index]
    }

    /// Offset at the lower edge of the given bin
    pub fn rho(&self, rho_index: usize) -> f64 {
        self.rho_min + rho_index as f64 * self.rho_bin
    }

    pub fn votes_at(&self, theta_index: usize, rho_index: usize) -> u32 {
        self.votes[theta_index * self.num_rho + rho_index]
    }

    pub fn total_votes(&self) -> u64 {
        self.votes.iter().map(|v| *v as u64).sum()
    }

    /// Selects up to `topk` peaks in descending order of votes. Peaks below
    /// `max(MIN_PEAK_VOTES, RELATIVE_PEAK_VOTES * max_votes)` are never selected, and every selected
    /// peak suppresses its neighbourhood so that one physical band yields one peak
    pub fn peaks(&self, topk: usize) -> Vec<HoughPeak> {
        let max_votes = self.votes.iter().copied().max().unwrap_or(0);
        let threshold = MIN_PEAK_VOTES.max((RELATIVE_PEAK_VOTES * max_votes as f64) as u32);

        let mut order: Vec<usize> = (0..self.votes.len()).collect();
        order.sort_by(|a, b| self.votes[*b].cmp(&self.votes[*a]).then(a.cmp(b)));

        let mut suppressed = vec![false; self.votes.len()];
        let mut peaks = Vec::new();
        for index in order {
            if peaks.len() >= topk {
                break;
            }
            if suppressed[index] {
                continue;
            }
            let votes = self.votes[index];
            if votes < threshold {
                break;
            }
            let theta_index = index / self.num_rho;
            let rho_index = index % self.num_rho;
            peaks.push(HoughPeak {
                theta_index,
                rho_index,
                votes,
            });

            let theta_end = (theta_index + SUPPRESS_THETA_BINS).min(self.num_theta() - 1);
            let rho_end = (rho_index + SUPPRESS_RHO_BINS).min(self.num_rho - 1);
            for t in theta_index.saturating_sub(SUPPRESS_THETA_BINS)..=theta_end {
                for r in rho_index.saturating_sub(SUPPRESS_RHO_BINS)..=rho_end {
                    suppressed[t * self.num_rho + r] = true;
                }
            }
        }
        peaks
    }
}

/// Angles `0, step, 2 * step, ...` below 180 degrees, in radians. Empty for a step that is not a
/// positive number
fn angle_bins(theta_step_deg: f64) -> Vec<f64> {
    let mut thetas = Vec::new();
    if !(theta_step_deg.is_finite() && theta_step_deg > 0.0) {
        return thetas;
    }
    let mut index = 0;
    loop {
        let degrees = index as f64 * theta_step_deg;
        if degrees >= 180.0 {
            break;
        }
        thetas.push(degrees.to_radians());
        index += 1;
    }
    thetas
}

/// Range of `rho` over all angles, taken from the corners of the bounding box of `centers`.
/// This is conservative: every center projects into this range for every angle
fn rho_range(centers: &[Vector2<f64>], thetas: &[f64]) -> (f64, f64) {
    let mut min = Vector2::new(f64::MAX, f64::MAX);
    let mut max = Vector2::new(f64::MIN, f64::MIN);
    for center in centers {
        min = min.inf(center);
        max = max.sup(center);
    }
    let corners = [
        Vector2::new(min.x, min.y),
        Vector2::new(min.x, max.y),
        Vector2::new(max.x, min.y),
        Vector2::new(max.x, max.y),
    ];

    let mut rho_min = f64::INFINITY;
    let mut rho_max = f64::NEG_INFINITY;
    for theta in thetas {
        let (sin, cos) = theta.sin_cos();
        for corner in corners.iter() {
            let rho = corner.x * cos + corner.y * sin;
            rho_min = rho_min.min(rho);
            rho_max = rho_max.max(rho);
        }
    }
    (rho_min, rho_max)
}

/// Validates the line of `peak` as a band. Returns the indices (into `centers`) of all centers within
/// `max_width / 2` of the line, or `None` if the band has too few cells, is too short, or its
/// estimated width lies outside `[min_width, max_width]`
fn validate_band(
    centers: &[Vector2<f64>],
    accumulator: &Accumulator,
    peak: &HoughPeak,
    params: &HoughParams,
) -> Option<Vec<usize>> {
    let theta = accumulator.theta(peak.theta_index);
    let rho = accumulator.rho(peak.rho_index);
    let (sin, cos) = theta.sin_cos();
    let normal = Vector2::new(cos, sin);
    let direction = Vector2::new(-sin, cos);

    let half_width = params.max_width / 2.0;
    let mut in_band = Vec::new();
    let mut distances = Vec::new();
    for (index, center) in centers.iter().enumerate() {
        let distance = (center.dot(&normal) - rho).abs();
        if distance <= half_width {
            in_band.push(index);
            distances.push(distance);
        }
    }
    if in_band.len() < MIN_BAND_CELLS {
        debug!(
            "Rejected Hough peak {:?}: only {} cells in band",
            peak,
            in_band.len()
        );
        return None;
    }

    let (t_min, t_max) = in_band.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(t_min, t_max), index| {
            let t = centers[*index].dot(&direction);
            (t_min.min(t), t_max.max(t))
        },
    );
    let length = t_max - t_min;
    if length < params.min_len {
        debug!("Rejected Hough peak {:?}: length {:.2}", peak, length);
        return None;
    }

    distances.sort_unstable_by_key(|d| FloatOrd(*d));
    let width = 2.0 * quantile_sorted(&distances, WIDTH_QUANTILE)?;
    if width < params.min_width || width > params.max_width {
        debug!("Rejected Hough peak {:?}: width {:.2}", peak, width);
        return None;
    }
    Some(in_band)
}

/// Finds straight bands among the `candidates` cells and returns the mask of their cells, grown by
/// `params.dilate_cells`. Returns an empty mask if there are fewer than [`MIN_CANDIDATE_CELLS`] candidates.
pub fn detect_hough_bands(
    geometry: &GridGeometry,
    candidates: &CellMask,
    params: &HoughParams,
) -> CellMask {
    let mut band_mask = Raster::filled(candidates.width(), candidates.height(), false);
    let valid_step = |step: f64| step.is_finite() && step > 0.0;
    if !valid_step(params.theta_step_deg) || !valid_step(params.rho_bin) {
        warn!(
            "Skipping Hough bands, angle step {} and offset bin {} must be positive",
            params.theta_step_deg, params.rho_bin
        );
        return band_mask;
    }
    let cells = candidates.set_indices();
    if cells.len() < MIN_CANDIDATE_CELLS {
        return band_mask;
    }

    let centers: Vec<Vector2<f64>> = cells
        .iter()
        .map(|cell| geometry.cell_center_at(*cell))
        .collect();
    let accumulator = Accumulator::vote(&centers, params.theta_step_deg, params.rho_bin);
    let peaks = accumulator.peaks(params.topk);
    if peaks.is_empty() {
        return band_mask;
    }

    for peak in peaks.iter() {
        if let Some(in_band) = validate_band(&centers, &accumulator, peak, params) {
            for index in in_band {
                band_mask.as_mut_slice()[cells[index]] = true;
            }
        }
    }

    if params.dilate_cells > 0 {
        band_mask = dilate(&band_mask, params.dilate_cells);
    }
    band_mask
}
