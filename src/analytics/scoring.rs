use crate::models::SessionFlag;

use super::config::ScoringConfig;

/// Aggregate metrics the quality score is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub coverage_percent: f64,
    pub high_touch_coverage_percent: Option<f64>,
    pub overwipe_ratio: f64,
    pub uniformity_std: f64,
    pub duration_secs: f64,
}

fn unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Weighted 0-100 score minus the rushing penalty, plus the raised flags.
pub fn compute_quality_score(inputs: &ScoreInputs, config: &ScoringConfig) -> (f64, Vec<SessionFlag>) {
    let mut flags = Vec::new();

    let coverage_score = unit(inputs.coverage_percent / 100.0);
    let high_touch_score = match inputs.high_touch_coverage_percent {
        Some(percent) => unit(percent / 100.0),
        None => {
            flags.push(SessionFlag::NoHighTouchMask);
            coverage_score
        }
    };
    let overwipe_score = unit(1.0 - inputs.overwipe_ratio / config.overwipe_ratio_ceiling);
    let uniformity_score = unit(1.0 - inputs.uniformity_std / config.uniformity_std_ceiling);

    let rushed = inputs.duration_secs < config.rushed_duration_secs
        && inputs.coverage_percent < config.rushed_coverage_percent;
    let penalty = if rushed {
        flags.push(SessionFlag::Rushed);
        config.rushing_penalty
    } else {
        0.0
    };

    if inputs
        .high_touch_coverage_percent
        .is_some_and(|percent| percent < config.missed_high_touch_percent)
    {
        flags.push(SessionFlag::MissedHighTouch);
    }
    if inputs.overwipe_ratio > config.overwiping_flag_ratio {
        flags.push(SessionFlag::Overwiping);
    }

    let raw = 100.0
        * (config.weight_coverage * coverage_score
            + config.weight_high_touch * high_touch_score
            + config.weight_overwipe * overwipe_score
            + config.weight_uniformity * uniformity_score);

    ((raw - penalty).clamp(0.0, 100.0), flags)
}
