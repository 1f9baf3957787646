pub mod controller;
pub mod heatmap;
pub mod state;

pub use controller::SessionController;
pub use heatmap::{AccumulatorConfig, ContactAccumulator, Heatmap, SurfaceMask};
pub use state::{FrozenSession, PreviewSurface, SessionSnapshot, SessionStatus, TrackerState};
