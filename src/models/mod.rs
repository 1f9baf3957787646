pub mod grid;
pub mod metrics;
pub mod session;

pub use grid::{CoverageGrid, Grid, HighTouchMask};
pub use metrics::{MissedCell, MissedPriority, SessionFlag, SessionMetrics};
pub use session::{SessionInfo, SessionRecord, WipeEvent};
