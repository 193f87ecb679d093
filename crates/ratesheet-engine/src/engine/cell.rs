//! Cell data structures for the rule-table grid.
//!
//! This module provides the core data types for representing a loaded sheet:
//! - [`CellValue`] - The cached computed value of a cell (empty, text, or number)
//! - [`Cell`] - A cell carrying both its raw formula text and its cached value
//! - [`Grid`] - Immutable sparse storage for one sheet, addressed by 1-based row/col
//!
//! A workbook loader normally hands out two views of a sheet (cached values and
//! raw formulas). `Grid` keeps both in one cell so the views cannot drift out of
//! index alignment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::cell_ref::CellRef;
use super::format::format_number;

/// The cached computed value of a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Numeric view of the value. Text is accepted when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => parse_number(s.trim()),
        }
    }

    /// Numeric view with the spreadsheet default of 0.0 for empty or non-numeric cells.
    pub fn to_f64_or_zero(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Trimmed string form used for label lookup and selection matching.
    pub fn trimmed(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

/// A cell in the grid: raw formula text (including the leading `=`) plus the
/// value the workbook last computed for it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub formula: Option<String>,
    pub value: CellValue,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell::default()
    }

    pub fn new_text(text: &str) -> Cell {
        Cell {
            formula: None,
            value: CellValue::Text(text.to_string()),
        }
    }

    pub fn new_number(n: f64) -> Cell {
        Cell {
            formula: None,
            value: CellValue::Number(n),
        }
    }

    /// Create a formula cell. `formula` is stored with a leading `=`.
    pub fn new_formula(formula: &str, cached: CellValue) -> Cell {
        let formula = formula.trim();
        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };
        Cell {
            formula: Some(formula),
            value: cached,
        }
    }

    /// Parse user input and create appropriate cell type.
    /// - Empty string or whitespace -> Empty
    /// - Starts with '=' -> Formula (no cached value)
    /// - Quoted string -> Text (without quotes)
    /// - Valid number -> Number
    /// - Otherwise -> Text
    pub fn from_input(input: &str) -> Cell {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Cell::new_empty();
        }

        if trimmed.starts_with('=') {
            return Cell::new_formula(trimmed, CellValue::Empty);
        }

        if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
            let text = &trimmed[1..trimmed.len() - 1];
            return Cell::new_text(text);
        }

        if let Some(n) = parse_number(trimmed) {
            return Cell::new_number(n);
        }

        Cell::new_text(trimmed)
    }

    pub fn is_formula(&self) -> bool {
        self.formula.as_deref().is_some_and(is_formula_text)
    }
}

/// Parse a finite number. "NaN", "inf" and "infinity" are not numbers here.
pub fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// True when `text` is formula text (starts with the `=` marker).
pub fn is_formula_text(text: &str) -> bool {
    text.starts_with('=')
}

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// Immutable sparse view of one sheet.
///
/// Built once by a loader and then shared (typically behind an `Arc`).
/// Rows and columns are 1-based.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    name: String,
    cells: HashMap<CellRef, Cell>,
    max_row: usize,
    max_col: usize,
}

impl Grid {
    pub fn new(name: impl Into<String>) -> Grid {
        Grid {
            name: name.into(),
            ..Grid::default()
        }
    }

    /// Sheet name the grid was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a cell while building the grid. Empty cells without formulas are
    /// not stored but still extend the sheet bounds.
    pub fn insert(&mut self, at: CellRef, cell: Cell) {
        if at.row == 0 || at.col == 0 {
            return;
        }
        self.max_row = self.max_row.max(at.row);
        self.max_col = self.max_col.max(at.col);
        if cell.formula.is_none() && cell.value == CellValue::Empty {
            self.cells.remove(&at);
        } else {
            self.cells.insert(at, cell);
        }
    }

    /// Builder-style [`Grid::insert`] from user-style input (see [`Cell::from_input`]).
    pub fn with(mut self, a1: &str, input: &str) -> Grid {
        if let Some(at) = CellRef::from_str(a1) {
            self.insert(at, Cell::from_input(input));
        }
        self
    }

    pub fn get(&self, at: &CellRef) -> Option<&Cell> {
        self.cells.get(at)
    }

    /// Cached value view: `cell(row, col) -> value`.
    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.cells
            .get(&CellRef::new(col, row))
            .map(|c| &c.value)
            .unwrap_or(&EMPTY_VALUE)
    }

    /// Raw formula view: `formulaText(row, col) -> string | none`.
    pub fn formula(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .get(&CellRef::new(col, row))
            .and_then(|c| c.formula.as_deref())
            .filter(|f| is_formula_text(f))
    }

    /// Trimmed non-empty text of a cell, used for header labels.
    pub fn label(&self, row: usize, col: usize) -> Option<String> {
        let text = self.value(row, col).trimmed();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn max_row(&self) -> usize {
        self.max_row
    }

    pub fn max_col(&self) -> usize {
        self.max_col
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellRef, &Cell)> {
        self.cells.iter()
    }
}
