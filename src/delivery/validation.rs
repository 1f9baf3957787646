//! Shape and identity checks a finished record must pass before it is scored
//! or stored.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::models::{CoverageGrid, Grid, HighTouchMask, SessionRecord};

/// A record that passed validation, with its grids in typed form.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSession {
    pub record: SessionRecord,
    pub grid: CoverageGrid,
    pub mask: Option<HighTouchMask>,
}

/// Stateless contract checks; duplicate ids are the validator's job.
pub fn validate_record(record: &SessionRecord) -> Result<(CoverageGrid, Option<HighTouchMask>), ValidationError> {
    if record.end_time < record.start_time {
        return Err(ValidationError::EndBeforeStart);
    }
    if record.grid_h == 0 || record.grid_w == 0 {
        return Err(ValidationError::NonPositiveDimensions {
            grid_h: record.grid_h,
            grid_w: record.grid_w,
        });
    }

    let rows = &record.coverage_count_grid;
    if rows.len() != record.grid_h {
        return Err(ValidationError::GridHeight {
            expected: record.grid_h,
            actual: rows.len(),
        });
    }
    if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != record.grid_w) {
        return Err(ValidationError::GridWidth {
            row,
            expected: record.grid_w,
            actual: values.len(),
        });
    }
    let grid = Grid::from_rows(rows)?;

    let mask = match &record.high_touch_mask {
        Some(mask_rows) => {
            let actual_h = mask_rows.len();
            let ragged = mask_rows.iter().any(|r| r.len() != record.grid_w);
            if actual_h != record.grid_h || ragged {
                return Err(ValidationError::MaskShape {
                    expected_h: record.grid_h,
                    expected_w: record.grid_w,
                    actual_h,
                    actual_w: mask_rows
                        .iter()
                        .map(Vec::len)
                        .find(|w| *w != record.grid_w)
                        .unwrap_or(record.grid_w),
                });
            }
            Some(HighTouchMask::from_wire(mask_rows)?)
        }
        None => None,
    };

    Ok((grid, mask))
}

/// Ingestion-side validator. Remembers the ids it has accepted for its own
/// lifetime; nothing is persisted.
#[derive(Debug, Default)]
pub struct IngestValidator {
    seen: HashSet<String>,
}

impl IngestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, record: SessionRecord) -> Result<ValidatedSession, ValidationError> {
        if self.seen.contains(&record.session_id) {
            return Err(ValidationError::DuplicateSession(record.session_id));
        }
        let (grid, mask) = validate_record(&record)?;
        self.seen.insert(record.session_id.clone());
        Ok(ValidatedSession { record, grid, mask })
    }

    pub fn accepted(&self) -> usize {
        self.seen.len()
    }
}
