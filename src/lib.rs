//! Surface cleaning coverage: live contact accumulation during a cleaning
//! pass, discretization into a coverage grid, and risk/quality scoring with
//! room-level aggregation.

pub mod aggregate;
pub mod analytics;
pub mod delivery;
pub mod error;
pub mod grid;
pub mod models;
pub mod profiles;
pub mod sensing;
pub mod settings;
pub mod tracking;
mod utils;

pub use error::{AggregateError, ProfileError, SettingsError, ValidationError};
pub use profiles::{HighTouchPattern, SurfaceProfile, SurfaceProfiles};
pub use settings::{SettingsStore, StationSettings};
pub use tracking::{SessionController, SessionSnapshot, SessionStatus};
pub use utils::{init_logging, init_logging_with_level};
