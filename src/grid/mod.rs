//! Session-end conversion of continuous contact into discrete cell grids.

pub mod discretize;
pub mod high_touch;

pub use discretize::{heatmap_to_grid, COVERAGE_SCALE};
pub use high_touch::{high_touch_mask, high_touch_mask_for_surface};
