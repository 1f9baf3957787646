use serde::{Deserialize, Serialize};

use crate::analytics::risk::{CellRisk, RiskCounts};

/// Qualitative markers raised by the quality scorer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionFlag {
    NoHighTouchMask,
    Rushed,
    MissedHighTouch,
    Overwiping,
}

impl SessionFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionFlag::NoHighTouchMask => "no_high_touch_mask",
            SessionFlag::Rushed => "rushed",
            SessionFlag::MissedHighTouch => "missed_high_touch",
            SessionFlag::Overwiping => "overwiping",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissedPriority {
    HighTouch,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissedCell {
    pub row: usize,
    pub col: usize,
    pub priority: MissedPriority,
}

/// Per-session scoring output, computed once and kept as history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMetrics {
    pub coverage_percent: f64,
    /// `None` when there is no mask or it marks no cells.
    pub high_touch_coverage_percent: Option<f64>,
    pub overwipe_ratio: f64,
    pub uniformity_std: f64,
    pub wipe_events_count: Option<usize>,
    pub quality_score: f64,
    pub missed_cells: Vec<MissedCell>,
    pub flags: Vec<SessionFlag>,
    pub risk_counts: RiskCounts,
    pub worst_risk: CellRisk,
    pub recommended_protocol: String,
    // Filled by downstream models; always unset here.
    pub cluster_label: Option<i64>,
    pub cluster_name: Option<String>,
    pub risk_prob: Option<f64>,
    pub risk_factors: Option<serde_json::Value>,
}

impl SessionMetrics {
    pub fn has_flag(&self, flag: SessionFlag) -> bool {
        self.flags.contains(&flag)
    }
}
