use crate::models::{CoverageGrid, HighTouchMask, MissedCell, MissedPriority};

/// Up to `k` uncovered cells: every missed high-touch cell first, then other
/// missed cells to fill the budget. Row-major within each tier.
pub fn top_missed_cells(grid: &CoverageGrid, mask: Option<&HighTouchMask>, k: usize) -> Vec<MissedCell> {
    let is_high_touch = |r: usize, c: usize| mask.and_then(|m| m.get(r, c)).unwrap_or(false);
    let missed = || grid.iter_cells().filter(|(_, _, count)| *count == 0);

    let high_touch = missed()
        .filter(|(r, c, _)| is_high_touch(*r, *c))
        .map(|(row, col, _)| MissedCell {
            row,
            col,
            priority: MissedPriority::HighTouch,
        });
    let normal = missed()
        .filter(|(r, c, _)| !is_high_touch(*r, *c))
        .map(|(row, col, _)| MissedCell {
            row,
            col,
            priority: MissedPriority::Normal,
        });

    high_touch.chain(normal).take(k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grid;

    #[test]
    fn high_touch_cells_come_first() {
        // Seven missed cells, two of them high-touch.
        let grid = Grid::from_rows(&[vec![0, 0, 0, 0], vec![0, 0, 0, 1]]).unwrap();
        let mask = HighTouchMask::from_wire(&[vec![0, 0, 0, 0], vec![0, 1, 1, 0]]).unwrap();

        let missed = top_missed_cells(&grid, Some(&mask), 3);
        assert_eq!(
            missed,
            vec![
                MissedCell { row: 1, col: 1, priority: MissedPriority::HighTouch },
                MissedCell { row: 1, col: 2, priority: MissedPriority::HighTouch },
                MissedCell { row: 0, col: 0, priority: MissedPriority::Normal },
            ]
        );
    }

    #[test]
    fn budget_truncates_high_touch_tier() {
        let grid = Grid::filled(3, 3, 0u32);
        let mask = HighTouchMask::filled(3, 3, true);
        let missed = top_missed_cells(&grid, Some(&mask), 4);
        assert_eq!(missed.len(), 4);
        assert!(missed.iter().all(|m| m.priority == MissedPriority::HighTouch));
    }

    #[test]
    fn without_mask_everything_is_normal() {
        let grid = Grid::from_rows(&[vec![0, 2, 0]]).unwrap();
        let missed = top_missed_cells(&grid, None, 15);
        assert_eq!(missed.len(), 2);
        assert!(missed.iter().all(|m| m.priority == MissedPriority::Normal));
    }

    #[test]
    fn fully_covered_grid_has_nothing_missed() {
        let grid = Grid::filled(2, 2, 1u32);
        assert!(top_missed_cells(&grid, None, 15).is_empty());
    }
}
