//! Typed failures for the cases callers need to tell apart.
//!
//! Control-path precondition failures (starting twice, stopping while idle)
//! stay as `anyhow` errors; the types here cover boundary validation,
//! startup configuration and room aggregation.

use thiserror::Error;

/// A session record or grid rejected before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("end_time must not be before start_time")]
    EndBeforeStart,

    #[error("coverage grid is empty")]
    EmptyGrid,

    #[error("grid dimensions must be positive, got {grid_h}x{grid_w}")]
    NonPositiveDimensions { grid_h: usize, grid_w: usize },

    #[error("coverage_count_grid height {actual} != grid_h {expected}")]
    GridHeight { expected: usize, actual: usize },

    #[error("coverage_count_grid row {row} has width {actual}, expected grid_w {expected}")]
    GridWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("high_touch_mask shape {actual_h}x{actual_w} must match grid {expected_h}x{expected_w}")]
    MaskShape {
        expected_h: usize,
        expected_w: usize,
        actual_h: usize,
        actual_w: usize,
    },

    #[error("high_touch_mask cell ({row}, {col}) holds {value}, expected 0 or 1")]
    NonBinaryMask { row: usize, col: usize, value: u8 },

    #[error("session_id {0} already exists")]
    DuplicateSession(String),
}

/// Malformed surface configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("surface profile '{surface_type}' has non-positive grid {grid_h}x{grid_w}")]
    NonPositiveDimensions {
        surface_type: String,
        grid_h: usize,
        grid_w: usize,
    },

    #[error("no surface profile registered for '{0}'")]
    UnknownSurfaceType(String),

    #[error("surface profile band width must be positive for '{0}'")]
    EmptyBand(String),

    #[error("failed to parse surface profiles: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read surface profiles: {0}")]
    Io(#[from] std::io::Error),
}

/// Station tuning that would stall the frame loop. Fatal at startup.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must lie in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f32,
    },

    #[error("{low} ({low_value}) and {high} ({high_value}) are out of order")]
    Inverted {
        low: &'static str,
        low_value: f32,
        high: &'static str,
        high_value: f32,
    },
}

impl SettingsError {
    pub(crate) fn positive(field: &'static str, value: f32) -> Result<(), Self> {
        // NaN fails the comparison too.
        if value > 0.0 {
            Ok(())
        } else {
            Err(Self::NonPositive { field, value })
        }
    }

    pub(crate) fn unit(field: &'static str, value: f32) -> Result<(), Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                field,
                range: "[0, 1]",
                value,
            })
        }
    }

    pub(crate) fn ordered(
        (low, low_value): (&'static str, f32),
        (high, high_value): (&'static str, f32),
        allow_equal: bool,
    ) -> Result<(), Self> {
        let in_order = if allow_equal {
            low_value <= high_value
        } else {
            low_value < high_value
        };
        if in_order {
            Ok(())
        } else {
            Err(Self::Inverted {
                low,
                low_value,
                high,
                high_value,
            })
        }
    }
}

/// Room aggregation could not produce a result. Reported, never fatal.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no sessions found for room {room_id} and surface type {surface_type}")]
    NoSessions {
        room_id: String,
        surface_type: String,
    },

    #[error("no usable grids among {sessions_found} sessions")]
    NoUsableGrids { sessions_found: usize },

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}
