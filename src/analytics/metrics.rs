//! Aggregate coverage statistics over one coverage grid.

use crate::models::{CoverageGrid, HighTouchMask, WipeEvent};

/// Percent of cells wiped at least once.
pub fn coverage_percent(grid: &CoverageGrid) -> f64 {
    if grid.is_empty() {
        return 0.0;
    }
    let covered = grid.cells().iter().filter(|v| **v > 0).count();
    covered as f64 / grid.len() as f64 * 100.0
}

/// Percent of high-touch cells wiped at least once. `None` without a mask or
/// when the mask marks nothing. Shapes are assumed validated.
pub fn high_touch_coverage_percent(grid: &CoverageGrid, mask: Option<&HighTouchMask>) -> Option<f64> {
    let mask = mask?;
    let marked = mask.count_marked();
    if marked == 0 {
        return None;
    }
    let covered = grid
        .cells()
        .iter()
        .zip(mask.cells())
        .filter(|(count, high_touch)| **high_touch && **count > 0)
        .count();
    Some(covered as f64 / marked as f64 * 100.0)
}

/// Fraction of cells at or above `threshold`.
pub fn overwipe_ratio(grid: &CoverageGrid, threshold: u32) -> f64 {
    if grid.is_empty() {
        return 0.0;
    }
    let over = grid.cells().iter().filter(|v| **v >= threshold).count();
    over as f64 / grid.len() as f64
}

/// Population standard deviation of the counts.
pub fn uniformity_std(grid: &CoverageGrid) -> f64 {
    if grid.is_empty() {
        return 0.0;
    }
    let n = grid.len() as f64;
    let mean = grid.cells().iter().map(|v| *v as f64).sum::<f64>() / n;
    let variance = grid
        .cells()
        .iter()
        .map(|v| {
            let d = *v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

pub fn wipe_events_count(events: Option<&[WipeEvent]>) -> Option<usize> {
    events.map(<[WipeEvent]>::len)
}
