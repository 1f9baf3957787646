use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One wipe gesture and the grid cells it touched, as `[row, col]` pairs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WipeEvent {
    pub t: DateTime<Utc>,
    pub cells: Vec<[usize; 2]>,
}

/// Outbound record produced when a recording finishes.
///
/// Grids travel in their nested wire form; [`crate::delivery::IngestValidator`]
/// turns them into typed grids after checking the shape contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub session_id: String,
    pub surface_id: String,
    pub surface_type: String,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub cleaner_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub grid_h: usize,
    pub grid_w: usize,
    pub coverage_count_grid: Vec<Vec<u32>>,
    #[serde(default)]
    pub high_touch_mask: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    pub wipe_events: Option<Vec<WipeEvent>>,
    #[serde(default)]
    pub camera_id: Option<String>,
}

impl SessionRecord {
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: String,
    pub surface_type: String,
    pub room_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub grid_h: usize,
    pub grid_w: usize,
}

impl From<&SessionRecord> for SessionInfo {
    fn from(record: &SessionRecord) -> Self {
        Self {
            session_id: record.session_id.clone(),
            surface_type: record.surface_type.clone(),
            room_id: record.room_id.clone(),
            started_at: record.start_time,
            stopped_at: record.end_time,
            duration_secs: record.duration_secs(),
            grid_h: record.grid_h,
            grid_w: record.grid_w,
        }
    }
}
