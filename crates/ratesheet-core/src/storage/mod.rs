//! Loading rule-table workbooks from disk.

mod csv;
mod grd;

pub use csv::{parse_csv, parse_csv_content};
pub use grd::{parse_grd, parse_grd_content};

use ratesheet_engine::engine::{Cell, CellRef, CellValue, Grid};
use std::path::Path;
use tracing::debug;

use crate::error::{RatesheetError, Result};

/// The sheets of one loaded workbook, in file order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Grid>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Grid> {
        self.sheets.iter().find(|g| g.name() == name)
    }

    /// Take the named sheet out of the workbook.
    pub fn take_sheet(&mut self, name: &str) -> Option<Grid> {
        let pos = self.sheets.iter().position(|g| g.name() == name)?;
        Some(self.sheets.remove(pos))
    }
}

/// Load a workbook, choosing the format by extension. A CSV file holds a
/// single sheet named `default_sheet`.
pub fn load_workbook(path: &Path, default_sheet: &str) -> Result<Workbook> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let workbook = match ext.as_str() {
        "grd" => parse_grd(path, default_sheet)?,
        "csv" => Workbook {
            sheets: vec![parse_csv(path, default_sheet)?],
        },
        _ => return Err(RatesheetError::UnsupportedFormat(path.display().to_string())),
    };

    debug!(path = %path.display(), sheets = workbook.sheets.len(), "loaded workbook");
    Ok(workbook)
}

/// Combine a formula view and a cached-value view of one sheet.
///
/// Both views must span the same rows and columns. Formula cells take their
/// cached value from `values`; plain cells in `formulas` are kept, and cells
/// present only in `values` are added.
pub fn merge_views(formulas: Grid, values: &Grid) -> Result<Grid> {
    if formulas.max_row() != values.max_row() || formulas.max_col() != values.max_col() {
        return Err(RatesheetError::ViewMismatch {
            values_rows: values.max_row(),
            values_cols: values.max_col(),
            formula_rows: formulas.max_row(),
            formula_cols: formulas.max_col(),
        });
    }

    let mut merged = Grid::new(formulas.name());
    for (at, cell) in formulas.iter() {
        let cell = match &cell.formula {
            Some(f) => {
                let cached = values.get(at).map(|c| c.value.clone()).unwrap_or(CellValue::Empty);
                Cell::new_formula(f, cached)
            }
            None => cell.clone(),
        };
        merged.insert(*at, cell);
    }
    for (at, cell) in values.iter() {
        if formulas.get(at).is_none() {
            merged.insert(*at, Cell { formula: None, value: cell.value.clone() });
        }
    }
    // Keep the input bounds even when trailing cells are blank
    let corner = CellRef::new(formulas.max_col(), formulas.max_row());
    if merged.get(&corner).is_none() {
        merged.insert(corner, Cell::new_empty());
    }
    Ok(merged)
}
