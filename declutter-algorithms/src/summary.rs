use serde::{Deserialize, Serialize};

use crate::config::DeclutterConfig;

/// What happened to the optional output of the removed points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovedOutput {
    #[default]
    NotRequested,
    Written,
    /// A destination was requested but no points were removed, so no file was produced
    Empty,
    /// A destination was requested but the points could not be written. This is distinct from a
    /// run that removed zero points
    Failed,
}

/// Immutable record of one run: the counts achieved plus the complete configuration, so that the run
/// can be reproduced exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclutterSummary {
    pub input_points: usize,
    pub removed_points: usize,
    pub kept_points: usize,
    pub dropped_non_finite: usize,
    pub components_accepted: usize,
    pub hough_band_cells: usize,
    #[serde(default)]
    pub removed_output: RemovedOutput,
    #[serde(flatten)]
    pub config: DeclutterConfig,
}

impl DeclutterSummary {
    /// Returns a copy of this summary that records the outcome of writing the removed points
    pub fn with_removed_output(&self, removed_output: RemovedOutput) -> Self {
        Self {
            removed_output,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn summary() -> DeclutterSummary {
        DeclutterSummary {
            input_points: 1050,
            removed_points: 50,
            kept_points: 1000,
            dropped_non_finite: 0,
            components_accepted: 1,
            hough_band_cells: 0,
            removed_output: RemovedOutput::NotRequested,
            config: DeclutterConfig::default(),
        }
    }

    #[test]
    fn test_summary_echoes_config_as_flat_keys() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(1050, json["input_points"]);
        assert_eq!(50, json["removed_points"]);
        assert_eq!(0.35, json["grid"]);
        assert_eq!(7, json["smooth_cells"]);
        assert_eq!(false, json["use_hough"]);
        assert_eq!(8.0, json["hough_min_len"]);
        assert_eq!("not_requested", json["removed_output"]);
    }

    #[test]
    fn test_summary_feeds_back_as_config() {
        let json = serde_json::to_string(&summary()).unwrap();
        let config: DeclutterConfig = serde_json::from_str(&json).unwrap();
        assert_approx_eq!(0.35, config.grid);
        assert_approx_eq!(2.2, config.min_elong);
        assert_eq!(5, config.density_min);
        assert_eq!(8, config.hough_topk);
        let parsed: DeclutterSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(1050, parsed.input_points);
        assert_eq!(50, parsed.removed_points);
        assert_eq!(RemovedOutput::NotRequested, parsed.removed_output);
        assert!(parsed.config.validate().is_ok());
    }

    #[test]
    fn test_empty_removed_output_serializes_distinctly() {
        let empty = summary().with_removed_output(RemovedOutput::Empty);
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!("empty", json["removed_output"]);
        let parsed: DeclutterSummary = serde_json::from_value(json).unwrap();
        assert_eq!(RemovedOutput::Empty, parsed.removed_output);
    }

    #[test]
    fn test_failed_removed_output_is_distinct() {
        let failed = summary().with_removed_output(RemovedOutput::Failed);
        assert_eq!(RemovedOutput::Failed, failed.removed_output);
        assert_eq!(summary().removed_points, failed.removed_points);
    }
}
