use chrono::{Duration, TimeZone, Utc};
use cleansight_lib::{
    aggregate::{
        most_disregarded, most_touched, overwiped_hotspots, MemoryGridSource, RankedCell,
        RoomQuery,
    },
    analytics::{score_record, top_missed_cells, ScoringConfig},
    delivery::IngestValidator,
    models::{Grid, HighTouchMask, MissedPriority, SessionRecord},
    AggregateError, ValidationError,
};

fn record(id: &str, minutes_ago: i64, rows: Vec<Vec<u32>>) -> SessionRecord {
    let end = Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap() - Duration::minutes(minutes_ago);
    let (grid_h, grid_w) = (rows.len(), rows.first().map(Vec::len).unwrap_or(0));
    SessionRecord {
        session_id: id.into(),
        surface_id: "TRAY_1".into(),
        surface_type: "tray".into(),
        room_id: Some("ICU_12".into()),
        cleaner_id: Some("C-7".into()),
        start_time: end - Duration::seconds(75),
        end_time: end,
        grid_h,
        grid_w,
        coverage_count_grid: rows,
        high_touch_mask: None,
        wipe_events: None,
        camera_id: Some("WEBCAM_1".into()),
    }
}

#[test]
fn heterogeneous_shapes_are_found_but_not_used() {
    let records = vec![
        record("a", 0, vec![vec![2, 0], vec![0, 1]]),
        record("b", 10, vec![vec![0, 0, 0]]),
        record("c", 20, vec![vec![1, 0], vec![4, 0]]),
    ];
    let source = MemoryGridSource::from_records(&records);
    let query = RoomQuery::new("ICU_12", "tray");

    let touched = most_touched(&source, &query).unwrap();
    assert_eq!((touched.sessions_found, touched.sessions_used), (3, 2));
    assert_eq!(touched.cells[0], RankedCell { row: 1, col: 0, count: 4 });

    let missed = most_disregarded(&source, &query).unwrap();
    assert_eq!(missed.sessions_used, 2);
    assert_eq!(missed.cells[0], RankedCell { row: 0, col: 1, count: 2 });

    let hot = overwiped_hotspots(&source, &query, 2).unwrap();
    assert_eq!(
        hot.cells,
        vec![
            RankedCell { row: 0, col: 0, count: 1 },
            RankedCell { row: 1, col: 0, count: 1 }
        ]
    );
}

#[test]
fn unknown_room_reports_no_sessions() {
    let source = MemoryGridSource::from_records(&[record("a", 0, vec![vec![1]])]);
    let err = most_touched(&source, &RoomQuery::new("OR_3", "tray")).unwrap_err();
    assert!(matches!(err, AggregateError::NoSessions { .. }));
}

#[test]
fn overwipe_ratio_example() {
    let metrics = score_record(
        &record("o", 0, vec![vec![3, 2], vec![4, 0]]),
        3,
        &ScoringConfig::default(),
    )
    .unwrap();
    assert_eq!(metrics.overwipe_ratio, 0.5);
    assert_eq!(metrics.high_touch_coverage_percent, None);
}

#[test]
fn missed_ranker_example() {
    // Two high-touch and five normal cells at zero.
    let grid = Grid::from_rows(&[vec![0, 0, 0, 1], vec![0, 0, 0, 0]]).unwrap();
    let mask = HighTouchMask::from_wire(&[vec![0, 1, 0, 0], vec![0, 0, 0, 1]]).unwrap();
    let missed = top_missed_cells(&grid, Some(&mask), 3);
    let priorities: Vec<MissedPriority> = missed.iter().map(|m| m.priority).collect();
    assert_eq!(
        priorities,
        vec![MissedPriority::HighTouch, MissedPriority::HighTouch, MissedPriority::Normal]
    );
}

#[test]
fn ingest_rejects_bad_records_before_scoring() {
    let mut validator = IngestValidator::new();
    let mut bad = record("x", 0, vec![vec![1, 2], vec![3, 4]]);
    bad.high_touch_mask = Some(vec![vec![1, 0, 0]]);
    assert!(matches!(
        validator.accept(bad).unwrap_err(),
        ValidationError::MaskShape { .. }
    ));
    assert!(score_record(&record("y", 0, vec![vec![1], vec![2, 3]]), 3, &ScoringConfig::default()).is_err());
}
