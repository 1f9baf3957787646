//! Per-cell contamination risk and the summaries derived from it.

use serde::{Deserialize, Serialize};

use crate::models::{CoverageGrid, Grid, HighTouchMask};

/// Ordinal risk, most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CellRisk {
    Critical,
    High,
    Medium,
    Low,
    Clear,
}

impl CellRisk {
    pub const ALL: [CellRisk; 5] = [
        CellRisk::Critical,
        CellRisk::High,
        CellRisk::Medium,
        CellRisk::Low,
        CellRisk::Clear,
    ];

    pub fn classify(coverage: u32, high_touch: bool) -> Self {
        match (high_touch, coverage) {
            (true, 0) => CellRisk::Critical,
            (true, 1) => CellRisk::High,
            (false, 0) => CellRisk::Medium,
            (true, _) => CellRisk::Low,
            (false, _) => CellRisk::Clear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CellRisk::Critical => "critical",
            CellRisk::High => "high",
            CellRisk::Medium => "medium",
            CellRisk::Low => "low",
            CellRisk::Clear => "clear",
        }
    }

    pub fn recommended_protocol(&self) -> &'static str {
        match self {
            CellRisk::Critical => "UV-C sweep + double wipe",
            CellRisk::High => "Microfiber spray + re-wipe",
            CellRisk::Medium => "Standard microfiber wipe",
            CellRisk::Low => "Spot clean",
            CellRisk::Clear => "Verification scan only",
        }
    }
}

pub type RiskMap = Grid<CellRisk>;

/// Classify every cell. Without a mask no cell is high-touch.
pub fn risk_map(grid: &CoverageGrid, mask: Option<&HighTouchMask>) -> RiskMap {
    Grid::from_fn(grid.height(), grid.width(), |r, c| {
        let coverage = grid.get(r, c).unwrap_or(0);
        let high_touch = mask.and_then(|m| m.get(r, c)).unwrap_or(false);
        CellRisk::classify(coverage, high_touch)
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub clear: usize,
}

impl RiskCounts {
    pub fn from_map(map: &RiskMap) -> Self {
        let mut counts = Self::default();
        for risk in map.cells() {
            *counts.slot(*risk) += 1;
        }
        counts
    }

    pub fn get(&self, risk: CellRisk) -> usize {
        match risk {
            CellRisk::Critical => self.critical,
            CellRisk::High => self.high,
            CellRisk::Medium => self.medium,
            CellRisk::Low => self.low,
            CellRisk::Clear => self.clear,
        }
    }

    /// Most severe level present; `Clear` for an empty map.
    pub fn worst(&self) -> CellRisk {
        CellRisk::ALL
            .into_iter()
            .find(|risk| self.get(*risk) > 0)
            .unwrap_or(CellRisk::Clear)
    }

    pub fn total(&self) -> usize {
        CellRisk::ALL.into_iter().map(|risk| self.get(risk)).sum()
    }

    fn slot(&mut self, risk: CellRisk) -> &mut usize {
        match risk {
            CellRisk::Critical => &mut self.critical,
            CellRisk::High => &mut self.high,
            CellRisk::Medium => &mut self.medium,
            CellRisk::Low => &mut self.low,
            CellRisk::Clear => &mut self.clear,
        }
    }
}

/// Cells to re-clean first: critical, then high, row-major within each.
pub fn focus_cells(map: &RiskMap) -> Vec<(usize, usize, CellRisk)> {
    [CellRisk::Critical, CellRisk::High]
        .into_iter()
        .flat_map(|level| map.iter_cells().filter(move |(_, _, risk)| *risk == level))
        .collect()
}

/// Side of the padded square the feature vector samples.
pub const FEATURE_GRID: usize = 10;
/// Two floats per padded cell plus two summary values.
pub const FEATURE_LEN: usize = FEATURE_GRID * FEATURE_GRID * 2 + 2;

const FEATURE_COVERAGE_CAP: u32 = 5;

/// Fixed-length session encoding for similarity search.
///
/// The top-left 10×10 cells (zero padded) contribute `(min(count, 5) / 5,
/// high_touch)` pairs, followed by the rounded coverage fraction and the
/// fraction of high-touch cells left uncleaned.
pub fn session_features(grid: &CoverageGrid, mask: Option<&HighTouchMask>) -> Vec<f32> {
    let mut features = Vec::with_capacity(FEATURE_LEN);
    for r in 0..FEATURE_GRID {
        for c in 0..FEATURE_GRID {
            let coverage = grid
                .get(r, c)
                .map(|v| v.min(FEATURE_COVERAGE_CAP) as f32 / FEATURE_COVERAGE_CAP as f32)
                .unwrap_or(0.0);
            let high_touch = mask.and_then(|m| m.get(r, c)).unwrap_or(false);
            features.push(coverage);
            features.push(if high_touch { 1.0 } else { 0.0 });
        }
    }

    let covered_percent = super::metrics::coverage_percent(grid).round_ties_even();
    features.push((covered_percent / 100.0) as f32);

    let (ht_total, ht_missed) = match mask {
        Some(mask) => grid
            .cells()
            .iter()
            .zip(mask.cells())
            .filter(|(_, high_touch)| **high_touch)
            .fold((0usize, 0usize), |(total, missed), (count, _)| {
                (total + 1, missed + usize::from(*count == 0))
            }),
        None => (0, 0),
    };
    features.push(ht_missed as f32 / ht_total.max(1) as f32);
    features
}
