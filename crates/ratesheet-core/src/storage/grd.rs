//! Parser for the .grd rule-table format
//!
//! ```text
//! # comment
//! [WAHL WH fee]
//! A2: "From"
//! B5: 10
//! E5: =B5+C5 => 15
//! ```
//!
//! A `[Name]` line starts a new sheet. Lines before the first section belong
//! to the default sheet.

use crate::error::{RatesheetError, Result};
use ratesheet_engine::engine::{Cell, CellRef, CellValue, Grid, parse_number};
use std::fs;
use std::path::Path;

use super::Workbook;

/// Parse a .grd file and return its sheets
pub fn parse_grd(path: &Path, default_sheet: &str) -> Result<Workbook> {
    let content = fs::read_to_string(path)?;
    parse_grd_content(&content, default_sheet)
}

/// Parse .grd content from a string
pub fn parse_grd_content(content: &str, default_sheet: &str) -> Result<Workbook> {
    let mut workbook = Workbook::default();
    let mut current = Grid::new(default_sheet);
    let mut touched = false;

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let next = Grid::new(name.trim());
            let done = std::mem::replace(&mut current, next);
            if touched {
                workbook.sheets.push(done);
            }
            touched = true;
            continue;
        }

        let Some((cell_ref_str, value_str)) = line.split_once(':') else {
            return Err(RatesheetError::Parse {
                line: line_num + 1,
                message: "Expected 'CELLREF: VALUE' format".to_string(),
            });
        };

        let cell_ref_str = cell_ref_str.trim();
        let cell_ref = CellRef::from_str(cell_ref_str).ok_or_else(|| RatesheetError::Parse {
            line: line_num + 1,
            message: format!("Invalid cell reference: {}", cell_ref_str),
        })?;

        let cell = parse_cell_value(value_str, line_num + 1)?;
        current.insert(cell_ref, cell);
        touched = true;
    }

    if touched {
        workbook.sheets.push(current);
    }
    Ok(workbook)
}

/// Parse a cell value string into a Cell
fn parse_cell_value(value: &str, line_num: usize) -> Result<Cell> {
    let value = value.trim();

    if value.is_empty() {
        return Ok(Cell::new_empty());
    }

    // Formula, optionally followed by the workbook's cached result
    if value.starts_with('=') {
        return Ok(match value.rsplit_once(" => ") {
            Some((formula, cached)) => {
                Cell::new_formula(formula, parse_cell_value(cached, line_num)?.value)
            }
            None => Cell::new_formula(value, CellValue::Empty),
        });
    }

    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let text = &value[1..value.len() - 1];
        return Ok(Cell::new_text(&unescape_grd_text(text)));
    }

    if let Some(n) = parse_number(value) {
        return Ok(Cell::new_number(n));
    }

    Err(RatesheetError::Parse {
        line: line_num,
        message: format!("Invalid value: {}. Use quotes for text.", value),
    })
}

fn unescape_grd_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
