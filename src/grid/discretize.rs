use crate::models::CoverageGrid;
use crate::sensing::SurfaceBox;
use crate::tracking::Heatmap;

/// Mean heat of 1.0 maps to this count.
pub const COVERAGE_SCALE: f64 = 10.0;

/// Convert the frozen heatmap inside `surface` into a `grid_h`×`grid_w`
/// coverage-count grid.
///
/// The crop is split into integer-sized cells; the last row and column absorb
/// the remainder. Each cell is `round(mean * 10)`, half to even, clamped to
/// `[0, 10]`. Cells that end up with no pixels (crop smaller than the grid)
/// are 0.
pub fn heatmap_to_grid(
    heatmap: &Heatmap,
    surface: SurfaceBox,
    grid_h: usize,
    grid_w: usize,
) -> CoverageGrid {
    let Some(crop) = surface.clipped(heatmap.width(), heatmap.height()) else {
        return CoverageGrid::filled(grid_h, grid_w, 0);
    };
    if grid_h == 0 || grid_w == 0 {
        return CoverageGrid::filled(grid_h, grid_w, 0);
    }

    let height = crop.height() as usize;
    let width = crop.width() as usize;
    let cell_h = (height / grid_h).max(1);
    let cell_w = (width / grid_w).max(1);

    let span = |index: usize, cell: usize, count: usize, extent: usize| {
        let start = (index * cell).min(extent);
        let end = if index + 1 < count {
            ((index + 1) * cell).min(extent)
        } else {
            extent
        };
        (start, end)
    };

    CoverageGrid::from_fn(grid_h, grid_w, |r, c| {
        let (y0, y1) = span(r, cell_h, grid_h, height);
        let (x0, x1) = span(c, cell_w, grid_w, width);
        let pixels = (y1 - y0) * (x1 - x0);
        if pixels == 0 {
            return 0;
        }

        let mut sum = 0.0f64;
        for y in y0..y1 {
            for x in x0..x1 {
                sum += heatmap.value(crop.x1 as u32 + x as u32, crop.y1 as u32 + y as u32) as f64;
            }
        }
        let mean = sum / pixels as f64;
        (mean * COVERAGE_SCALE)
            .round_ties_even()
            .clamp(0.0, COVERAGE_SCALE) as u32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heatmap(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Heatmap {
        let mut values = Vec::new();
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Heatmap::from_values(width, height, values).unwrap()
    }

    #[test]
    fn uniform_heat_quantizes_per_cell() {
        let map = heatmap(40, 20, |_, _| 0.5);
        let grid = heatmap_to_grid(&map, SurfaceBox::new(0, 0, 40, 20), 2, 4);
        assert_eq!(grid.shape(), (2, 4));
        assert!(grid.cells().iter().all(|v| *v == 5));
    }

    #[test]
    fn crop_is_relative_to_surface_box() {
        // Left half hot, right half cold; box covers only the right half.
        let map = heatmap(20, 10, |x, _| if x < 10 { 1.0 } else { 0.0 });
        let right = heatmap_to_grid(&map, SurfaceBox::new(10, 0, 20, 10), 2, 2);
        assert!(right.cells().iter().all(|v| *v == 0));

        let left = heatmap_to_grid(&map, SurfaceBox::new(0, 0, 10, 10), 2, 2);
        assert!(left.cells().iter().all(|v| *v == 10));
    }

    #[test]
    fn last_row_and_column_absorb_remainder() {
        // 7 wide into 3 columns: widths 2, 2, 3. Only x == 6 is hot.
        let map = heatmap(7, 1, |x, _| if x == 6 { 1.0 } else { 0.0 });
        let grid = heatmap_to_grid(&map, SurfaceBox::new(0, 0, 7, 1), 1, 3);
        assert_eq!(grid.to_rows(), vec![vec![0, 0, 3]]);
    }

    #[test]
    fn empty_crop_yields_zero_grid() {
        let map = heatmap(10, 10, |_, _| 1.0);
        let grid = heatmap_to_grid(&map, SurfaceBox::new(20, 20, 30, 30), 3, 4);
        assert_eq!(grid.shape(), (3, 4));
        assert!(grid.cells().iter().all(|v| *v == 0));
    }

    #[test]
    fn crop_smaller_than_grid_leaves_trailing_cells_empty() {
        let map = heatmap(2, 2, |_, _| 1.0);
        let grid = heatmap_to_grid(&map, SurfaceBox::new(0, 0, 2, 2), 3, 3);
        assert_eq!(grid.to_rows(), vec![vec![10, 10, 0], vec![10, 10, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn ties_round_to_even() {
        // Mean 0.25 -> 2.5 -> 2; mean 0.75 -> 7.5 -> 8.
        let map = heatmap(2, 1, |x, _| if x == 0 { 0.25 } else { 0.75 });
        let grid = heatmap_to_grid(&map, SurfaceBox::new(0, 0, 2, 1), 1, 2);
        assert_eq!(grid.to_rows(), vec![vec![2, 8]]);
    }

    #[test]
    fn discretization_is_repeatable() {
        let map = heatmap(33, 17, |x, y| ((x * 7 + y * 3) % 11) as f32 / 10.0);
        let surface = SurfaceBox::new(2, 1, 31, 16);
        assert_eq!(
            heatmap_to_grid(&map, surface, 5, 6),
            heatmap_to_grid(&map, surface, 5, 6)
        );
    }
}
