use serde::{Deserialize, Serialize};

/// Weights and thresholds for the quality score and flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Quality score weights; they sum to 1.
    pub weight_coverage: f64,
    pub weight_high_touch: f64,
    pub weight_overwipe: f64,
    pub weight_uniformity: f64,

    /// Overwipe ratio at which the overwipe component reaches zero.
    pub overwipe_ratio_ceiling: f64,
    /// Standard deviation at which the uniformity component reaches zero.
    pub uniformity_std_ceiling: f64,

    /// Rushing penalty applies below both of these.
    pub rushed_duration_secs: f64,
    pub rushed_coverage_percent: f64,
    pub rushing_penalty: f64,

    pub missed_high_touch_percent: f64,
    pub overwiping_flag_ratio: f64,

    /// Count at which a cell counts as overwiped.
    pub overwipe_threshold: u32,
    /// How many missed cells to report.
    pub missed_cell_budget: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_coverage: 0.35,
            weight_high_touch: 0.35,
            weight_overwipe: 0.15,
            weight_uniformity: 0.15,
            overwipe_ratio_ceiling: 0.20,
            uniformity_std_ceiling: 5.0,
            rushed_duration_secs: 30.0,
            rushed_coverage_percent: 70.0,
            rushing_penalty: 15.0,
            missed_high_touch_percent: 70.0,
            overwiping_flag_ratio: 0.10,
            overwipe_threshold: 3,
            missed_cell_budget: 15,
        }
    }
}
