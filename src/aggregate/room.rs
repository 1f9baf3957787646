//! Cross-session summaries for one room and surface type.

use serde::{Deserialize, Serialize};

use crate::error::AggregateError;
use crate::models::{CoverageGrid, Grid};

use super::source::SessionGridSource;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const DEFAULT_MAX_SESSIONS: usize = 50;
pub const DEFAULT_TOP_K: usize = 20;
pub const DEFAULT_OVERWIPE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateKind {
    /// Summed coverage counts per cell.
    MostTouched,
    /// Sessions in which each cell was left at zero.
    MostDisregarded,
    /// Sessions in which each cell reached `threshold`.
    OverwipedHotspots { threshold: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomQuery {
    pub room_id: String,
    pub surface_type: String,
    /// How many recent sessions to consider.
    pub max_sessions: usize,
    /// How many cells to return.
    pub top_k: usize,
}

impl RoomQuery {
    pub fn new(room_id: impl Into<String>, surface_type: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            surface_type: surface_type.into(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedCell {
    pub row: usize,
    pub col: usize,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomAggregate {
    pub room_id: String,
    pub surface_type: String,
    #[serde(flatten)]
    pub kind: AggregateKind,
    /// Sessions matching the room and surface type.
    pub sessions_found: usize,
    /// Sessions whose grid matched the reference shape.
    pub sessions_used: usize,
    pub grid_h: usize,
    pub grid_w: usize,
    /// Descending by count; row-major among ties.
    pub cells: Vec<RankedCell>,
}

pub fn aggregate(
    source: &dyn SessionGridSource,
    query: &RoomQuery,
    kind: AggregateKind,
) -> Result<RoomAggregate, AggregateError> {
    let (sessions_found, grids) = usable_grids(source, query)?;
    let (grid_h, grid_w) = grids.first().map(Grid::shape).unwrap_or((0, 0));

    let mut totals = Grid::filled(grid_h, grid_w, 0u64);
    for grid in &grids {
        for (r, c, count) in grid.iter_cells() {
            let add = match kind {
                AggregateKind::MostTouched => count as u64,
                AggregateKind::MostDisregarded => u64::from(count == 0),
                AggregateKind::OverwipedHotspots { threshold } => u64::from(count >= threshold),
            };
            let current = totals.get(r, c).unwrap_or(0);
            totals.set(r, c, current + add);
        }
    }

    // Summed touches list every cell; the frequency views only cells that
    // occurred at least once.
    let keep_zero = matches!(kind, AggregateKind::MostTouched);
    let mut cells: Vec<RankedCell> = totals
        .iter_cells()
        .filter(|(_, _, count)| keep_zero || *count > 0)
        .map(|(row, col, count)| RankedCell { row, col, count })
        .collect();
    cells.sort_by(|a, b| b.count.cmp(&a.count));
    cells.truncate(query.top_k);

    log_debug!(
        "{:?} for {}/{}: {} of {} sessions used",
        kind,
        query.room_id,
        query.surface_type,
        grids.len(),
        sessions_found
    );

    Ok(RoomAggregate {
        room_id: query.room_id.clone(),
        surface_type: query.surface_type.clone(),
        kind,
        sessions_found,
        sessions_used: grids.len(),
        grid_h,
        grid_w,
        cells,
    })
}

pub fn most_touched(source: &dyn SessionGridSource, query: &RoomQuery) -> Result<RoomAggregate, AggregateError> {
    aggregate(source, query, AggregateKind::MostTouched)
}

pub fn most_disregarded(
    source: &dyn SessionGridSource,
    query: &RoomQuery,
) -> Result<RoomAggregate, AggregateError> {
    aggregate(source, query, AggregateKind::MostDisregarded)
}

pub fn overwiped_hotspots(
    source: &dyn SessionGridSource,
    query: &RoomQuery,
    threshold: u32,
) -> Result<RoomAggregate, AggregateError> {
    aggregate(source, query, AggregateKind::OverwipedHotspots { threshold })
}

/// Fetch, parse and shape-filter the recent grids. The newest parseable grid
/// fixes the reference shape; empty or ragged grids are skipped like
/// mismatched ones.
fn usable_grids(
    source: &dyn SessionGridSource,
    query: &RoomQuery,
) -> Result<(usize, Vec<CoverageGrid>), AggregateError> {
    let stored = source.recent_grids(&query.room_id, &query.surface_type, query.max_sessions)?;
    if stored.is_empty() {
        return Err(AggregateError::NoSessions {
            room_id: query.room_id.clone(),
            surface_type: query.surface_type.clone(),
        });
    }

    let parsed: Vec<CoverageGrid> = stored
        .iter()
        .filter_map(|s| Grid::from_rows(&s.rows).ok())
        .collect();
    let Some(shape) = parsed.first().map(Grid::shape) else {
        return Err(AggregateError::NoUsableGrids {
            sessions_found: stored.len(),
        });
    };
    let grids = parsed.into_iter().filter(|g| g.shape() == shape).collect();
    Ok((stored.len(), grids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::source::{MemoryGridSource, StoredGrid};
    use chrono::{Duration, TimeZone, Utc};

    fn source(grids: Vec<Vec<Vec<u32>>>) -> MemoryGridSource {
        let source = MemoryGridSource::new();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        // First grid is the newest.
        for (i, rows) in grids.into_iter().enumerate() {
            let end = base - Duration::minutes(i as i64);
            source.insert_grid(
                Some("ICU_12".into()),
                "tray",
                StoredGrid {
                    session_id: format!("s{i}"),
                    start_time: end - Duration::minutes(1),
                    end_time: Some(end),
                    rows,
                },
            );
        }
        source
    }

    fn query() -> RoomQuery {
        RoomQuery::new("ICU_12", "tray")
    }

    #[test]
    fn most_touched_sums_matching_shapes_only() {
        let src = source(vec![
            vec![vec![1, 0], vec![3, 2]],
            vec![vec![4, 0], vec![0, 2]],
            vec![vec![9, 9, 9]],
        ]);
        let agg = most_touched(&src, &query()).unwrap();
        assert_eq!(agg.sessions_found, 3);
        assert_eq!(agg.sessions_used, 2);
        assert_eq!((agg.grid_h, agg.grid_w), (2, 2));
        assert_eq!(
            agg.cells,
            vec![
                RankedCell { row: 0, col: 0, count: 5 },
                RankedCell { row: 1, col: 1, count: 4 },
                RankedCell { row: 1, col: 0, count: 3 },
                RankedCell { row: 0, col: 1, count: 0 },
            ]
        );
    }

    #[test]
    fn disregarded_counts_zero_sessions() {
        let src = source(vec![vec![vec![0, 1, 0]], vec![vec![0, 2, 1]]]);
        let agg = most_disregarded(&src, &query()).unwrap();
        assert_eq!(
            agg.cells,
            vec![
                RankedCell { row: 0, col: 0, count: 2 },
                RankedCell { row: 0, col: 2, count: 1 },
            ]
        );
    }

    #[test]
    fn hotspots_use_caller_threshold_and_top_k() {
        let src = source(vec![vec![vec![5, 3, 1]], vec![vec![5, 4, 0]], vec![vec![2, 6, 0]]]);
        let mut q = query();
        q.top_k = 1;
        let agg = overwiped_hotspots(&src, &q, 4).unwrap();
        assert_eq!(agg.kind, AggregateKind::OverwipedHotspots { threshold: 4 });
        assert_eq!(agg.cells, vec![RankedCell { row: 0, col: 0, count: 2 }]);
    }

    #[test]
    fn session_bound_limits_to_newest() {
        let src = source(vec![vec![vec![1]], vec![vec![1]], vec![vec![1]]]);
        let mut q = query();
        q.max_sessions = 2;
        let agg = most_touched(&src, &q).unwrap();
        assert_eq!(agg.sessions_found, 2);
        assert_eq!(agg.cells[0].count, 2);
    }

    #[test]
    fn no_sessions_and_no_usable_grids_are_distinct_errors() {
        let empty = MemoryGridSource::new();
        assert!(matches!(
            most_touched(&empty, &query()).unwrap_err(),
            AggregateError::NoSessions { .. }
        ));

        let broken = source(vec![vec![], vec![vec![1, 2], vec![3]]]);
        assert!(matches!(
            most_disregarded(&broken, &query()).unwrap_err(),
            AggregateError::NoUsableGrids { sessions_found: 2 }
        ));
    }

    #[test]
    fn aggregate_serializes_kind_inline() {
        let src = source(vec![vec![vec![3]]]);
        let agg = overwiped_hotspots(&src, &query(), 3).unwrap();
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["kind"], "overwiped_hotspots");
        assert_eq!(json["threshold"], 3);
        assert_eq!(json["sessions_used"], 1);
    }
}
