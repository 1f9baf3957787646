use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::SessionRecord;

/// One stored session's grid as the query side sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGrid {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Wire rows; may be empty or ragged if storage holds bad data.
    pub rows: Vec<Vec<u32>>,
}

impl StoredGrid {
    /// Recency key: end time, else start time.
    pub fn recency(&self) -> DateTime<Utc> {
        self.end_time.unwrap_or(self.start_time)
    }
}

impl From<&SessionRecord> for StoredGrid {
    fn from(record: &SessionRecord) -> Self {
        Self {
            session_id: record.session_id.clone(),
            start_time: record.start_time,
            end_time: Some(record.end_time),
            rows: record.coverage_count_grid.clone(),
        }
    }
}

/// Query boundary over persisted session grids.
pub trait SessionGridSource: Send + Sync {
    /// Up to `limit` sessions for the room and surface type, newest first.
    fn recent_grids(&self, room_id: &str, surface_type: &str, limit: usize) -> Result<Vec<StoredGrid>>;
}

#[derive(Debug, Clone)]
struct Entry {
    room_id: Option<String>,
    surface_type: String,
    grid: StoredGrid,
}

/// In-process grid store.
#[derive(Debug, Default)]
pub struct MemoryGridSource {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SessionRecord>) -> Self {
        let source = Self::new();
        for record in records {
            source.insert(record);
        }
        source
    }

    pub fn insert(&self, record: &SessionRecord) {
        self.insert_grid(record.room_id.clone(), &record.surface_type, StoredGrid::from(record));
    }

    pub fn insert_grid(&self, room_id: Option<String>, surface_type: &str, grid: StoredGrid) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                room_id,
                surface_type: surface_type.to_string(),
                grid,
            });
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionGridSource for MemoryGridSource {
    fn recent_grids(&self, room_id: &str, surface_type: &str, limit: usize) -> Result<Vec<StoredGrid>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<StoredGrid> = entries
            .iter()
            .filter(|e| e.room_id.as_deref() == Some(room_id) && e.surface_type == surface_type)
            .map(|e| e.grid.clone())
            .collect();
        matching.sort_by(|a, b| b.recency().cmp(&a.recency()));
        matching.truncate(limit);
        Ok(matching)
    }
}
