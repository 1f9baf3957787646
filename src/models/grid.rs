//! Row-major H×W matrices shared by the discretizer, scoring and aggregation.

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    height: usize,
    width: usize,
    cells: Vec<T>,
}

/// Integer wipe-count proxy per cell.
pub type CoverageGrid = Grid<u32>;

/// Infection-critical cells for one surface type.
pub type HighTouchMask = Grid<bool>;

impl<T: Copy> Grid<T> {
    pub fn filled(height: usize, width: usize, value: T) -> Self {
        Self {
            height,
            width,
            cells: vec![value; height * width],
        }
    }

    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(height * width);
        for r in 0..height {
            for c in 0..width {
                cells.push(f(r, c));
            }
        }
        Self {
            height,
            width,
            cells,
        }
    }

    /// Build from nested rows, rejecting ragged or empty input.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self, ValidationError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(ValidationError::EmptyGrid);
        }

        let mut cells = Vec::with_capacity(height * width);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(ValidationError::GridWidth {
                    row,
                    expected: width,
                    actual: values.len(),
                });
            }
            cells.extend_from_slice(values);
        }

        Ok(Self {
            height,
            width,
            cells,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.cells[row * self.width + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = value;
        }
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// `(row, col, value)` in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, value)| (i / width, i % width, *value))
    }

    pub fn map<U: Copy>(&self, mut f: impl FnMut(T) -> U) -> Grid<U> {
        Grid {
            height: self.height,
            width: self.width,
            cells: self.cells.iter().map(|value| f(*value)).collect(),
        }
    }

    pub fn to_rows(&self) -> Vec<Vec<T>> {
        if self.width == 0 {
            return vec![Vec::new(); self.height];
        }
        self.cells.chunks(self.width).map(<[T]>::to_vec).collect()
    }
}

impl HighTouchMask {
    /// Wire form: 0/1 integers.
    pub fn to_wire(&self) -> Vec<Vec<u8>> {
        self.map(u8::from).to_rows()
    }

    pub fn from_wire(rows: &[Vec<u8>]) -> Result<Self, ValidationError> {
        let raw = Grid::from_rows(rows)?;
        if let Some((row, col, value)) = raw.iter_cells().find(|(_, _, value)| *value > 1) {
            return Err(ValidationError::NonBinaryMask { row, col, value });
        }
        Ok(raw.map(|value| value == 1))
    }

    pub fn count_marked(&self) -> usize {
        self.cells.iter().filter(|marked| **marked).count()
    }
}
