//! Session scoring: per-cell risk, coverage metrics, the quality score and
//! the missed-zone shortlist.

pub mod config;
pub mod metrics;
pub mod missed;
pub mod pipeline;
pub mod risk;
pub mod scoring;

pub use config::ScoringConfig;
pub use missed::top_missed_cells;
pub use pipeline::{run_pipeline, score_record, PipelineInput};
pub use risk::{
    focus_cells, risk_map, session_features, CellRisk, RiskCounts, RiskMap, FEATURE_LEN,
};
pub use scoring::{compute_quality_score, ScoreInputs};
