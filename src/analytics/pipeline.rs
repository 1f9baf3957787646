use crate::error::ValidationError;
use crate::models::{CoverageGrid, HighTouchMask, SessionMetrics, SessionRecord, WipeEvent};

use super::config::ScoringConfig;
use super::metrics::{
    coverage_percent, high_touch_coverage_percent, overwipe_ratio, uniformity_std,
    wipe_events_count,
};
use super::missed::top_missed_cells;
use super::risk::{risk_map, RiskCounts};
use super::scoring::{compute_quality_score, ScoreInputs};

/// What the ingestion side passes in for one accepted session.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInput<'a> {
    pub grid: &'a CoverageGrid,
    pub mask: Option<&'a HighTouchMask>,
    pub wipe_events: Option<&'a [WipeEvent]>,
    pub duration_secs: f64,
    pub overwipe_threshold: u32,
}

/// Score one session. The mask must match the grid; a mismatch is rejected
/// before anything is computed.
pub fn run_pipeline(input: PipelineInput<'_>, config: &ScoringConfig) -> Result<SessionMetrics, ValidationError> {
    let grid = input.grid;
    if grid.is_empty() {
        return Err(ValidationError::EmptyGrid);
    }
    if let Some(mask) = input.mask {
        if mask.shape() != grid.shape() {
            return Err(ValidationError::MaskShape {
                expected_h: grid.height(),
                expected_w: grid.width(),
                actual_h: mask.height(),
                actual_w: mask.width(),
            });
        }
    }

    let coverage = coverage_percent(grid);
    let high_touch = high_touch_coverage_percent(grid, input.mask);
    let overwipe = overwipe_ratio(grid, input.overwipe_threshold);
    let uniformity = uniformity_std(grid);

    let (quality_score, flags) = compute_quality_score(
        &ScoreInputs {
            coverage_percent: coverage,
            high_touch_coverage_percent: high_touch,
            overwipe_ratio: overwipe,
            uniformity_std: uniformity,
            duration_secs: input.duration_secs,
        },
        config,
    );

    let risk_counts = RiskCounts::from_map(&risk_map(grid, input.mask));
    let worst_risk = risk_counts.worst();

    Ok(SessionMetrics {
        coverage_percent: coverage,
        high_touch_coverage_percent: high_touch,
        overwipe_ratio: overwipe,
        uniformity_std: uniformity,
        wipe_events_count: wipe_events_count(input.wipe_events),
        quality_score,
        missed_cells: top_missed_cells(grid, input.mask, config.missed_cell_budget),
        flags,
        risk_counts,
        worst_risk,
        recommended_protocol: worst_risk.recommended_protocol().to_string(),
        cluster_label: None,
        cluster_name: None,
        risk_prob: None,
        risk_factors: None,
    })
}

/// Validate a wire record and score it with `overwipe_threshold`.
pub fn score_record(
    record: &SessionRecord,
    overwipe_threshold: u32,
    config: &ScoringConfig,
) -> Result<SessionMetrics, ValidationError> {
    let (grid, mask) = crate::delivery::validate_record(record)?;
    run_pipeline(
        PipelineInput {
            grid: &grid,
            mask: mask.as_ref(),
            wipe_events: record.wipe_events.as_deref(),
            duration_secs: record.duration_secs(),
            overwipe_threshold,
        },
        config,
    )
}
