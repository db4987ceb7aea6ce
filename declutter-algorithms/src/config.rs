use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// All parameters of a declutter run. Field names match the keys of the JSON run summary, so a
/// summary can be fed back in as a configuration to reproduce a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclutterConfig {
    /// Horizontal cell size of the grid, in the length unit of the points
    pub grid: f64,
    /// Quantile of the cell heights that approximates the ground
    pub q_low: f64,
    /// Quantile of the cell heights that approximates the top of any clutter
    pub q_high: f64,
    /// Radius in cells of the box filter that smooths the ground layer
    pub smooth_cells: usize,
    pub h_min: f64,
    pub h_max: f64,
    /// Minimum principal length of an accepted component
    pub min_len: f64,
    pub min_width: f64,
    pub max_width: f64,
    /// Minimum ratio of principal length to principal width
    pub min_elong: f64,
    /// Minimum number of points in a cell for it to become a candidate
    pub density_min: u32,
    pub use_hough: bool,
    /// Angular resolution of the Hough accumulator in degrees
    pub hough_theta_step: f64,
    /// Offset resolution of the Hough accumulator
    pub hough_rho_bin: f64,
    /// Maximum number of accumulator peaks that are validated as bands
    pub hough_topk: usize,
    pub hough_min_len: f64,
    pub hough_min_w: f64,
    pub hough_max_w: f64,
    /// Number of cells by which detected bands are grown
    pub hough_dilate: usize,
    /// Collect keep-cell diagnostics alongside the result
    pub debug_dump: bool,
}

impl Default for DeclutterConfig {
    fn default() -> Self {
        Self {
            grid: 0.35,
            q_low: 0.02,
            q_high: 0.90,
            smooth_cells: 7,
            h_min: 0.20,
            h_max: 3.0,
            min_len: 3.0,
            min_width: 1.4,
            max_width: 3.5,
            min_elong: 2.2,
            density_min: 5,
            use_hough: false,
            hough_theta_step: 5.0,
            hough_rho_bin: 0.5,
            hough_topk: 8,
            hough_min_len: 8.0,
            hough_min_w: 1.0,
            hough_max_w: 4.5,
            hough_dilate: 1,
            debug_dump: false,
        }
    }
}

/// Geometric thresholds that a connected component has to satisfy to count as clutter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeThresholds {
    pub min_len: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub min_elong: f64,
}

/// Parameters of the Hough band detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    pub theta_step_deg: f64,
    pub rho_bin: f64,
    pub topk: usize,
    pub min_len: f64,
    pub min_width: f64,
    pub max_width: f64,
    pub dilate_cells: usize,
}

impl DeclutterConfig {
    pub fn shape_thresholds(&self) -> ShapeThresholds {
        ShapeThresholds {
            min_len: self.min_len,
            min_width: self.min_width,
            max_width: self.max_width,
            min_elong: self.min_elong,
        }
    }

    pub fn hough_params(&self) -> HoughParams {
        HoughParams {
            theta_step_deg: self.hough_theta_step,
            rho_bin: self.hough_rho_bin,
            topk: self.hough_topk,
            min_len: self.hough_min_len,
            min_width: self.hough_min_w,
            max_width: self.hough_max_w,
            dilate_cells: self.hough_dilate,
        }
    }

    /// Checks that the parameters describe a meaningful run. Heuristic thresholds are not
    /// checked beyond their ordering, a run that can never remove anything is still valid
    pub fn validate(&self) -> Result<()> {
        if !(self.grid.is_finite() && self.grid > 0.0) {
            bail!("grid must be a positive number, got {}", self.grid);
        }
        if !(0.0 <= self.q_low && self.q_low < self.q_high && self.q_high <= 1.0) {
            bail!(
                "Quantiles must satisfy 0 <= q_low < q_high <= 1, got q_low={} q_high={}",
                self.q_low,
                self.q_high
            );
        }
        if self.h_min.is_nan() || self.h_max.is_nan() || self.h_min > self.h_max {
            bail!(
                "h_min must not exceed h_max, got h_min={} h_max={}",
                self.h_min,
                self.h_max
            );
        }
        if self.min_width > self.max_width {
            bail!(
                "min_width must not exceed max_width, got min_width={} max_width={}",
                self.min_width,
                self.max_width
            );
        }
        if !(self.hough_theta_step.is_finite() && self.hough_theta_step > 0.0) {
            bail!(
                "hough_theta_step must be a positive number, got {}",
                self.hough_theta_step
            );
        }
        if !(self.hough_rho_bin.is_finite() && self.hough_rho_bin > 0.0) {
            bail!(
                "hough_rho_bin must be a positive number, got {}",
                self.hough_rho_bin
            );
        }
        if self.hough_min_w > self.hough_max_w {
            bail!(
                "hough_min_w must not exceed hough_max_w, got hough_min_w={} hough_max_w={}",
                self.hough_min_w,
                self.hough_max_w
            );
        }
        Ok(())
    }
}
