//! Reference extraction from formula strings.
//!
//! Finds the cell references (e.g., `A1`, `$B$2`) and range sums
//! (e.g., `SUM(B2:C5)`) a formula depends on.
//!
//! Handles:
//! - Simple cell references: `A1`, `B2`
//! - Absolute anchors: `$A$1`, `A$1`
//! - Range sums: `SUM(A1:B5)`

use regex::Regex;
use std::sync::OnceLock;

use super::cell_ref::CellRef;

/// Largest rectangle a single range sum may cover.
pub const MAX_RANGE_CELLS: usize = 1_000_000;

/// A rectangular range, normalized so `start` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(a: CellRef, b: CellRef) -> RangeRef {
        RangeRef {
            start: CellRef::new(a.col.min(b.col), a.row.min(b.row)),
            end: CellRef::new(a.col.max(b.col), a.row.max(b.row)),
        }
    }

    /// Number of cells in the rectangle, or None on overflow.
    pub fn cell_count(&self) -> Option<usize> {
        let rows = self.end.row - self.start.row + 1;
        let cols = self.end.col - self.start.col + 1;
        rows.checked_mul(cols)
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellRef::new(col, row)))
    }
}

/// Regex that matches range sums like `SUM(A1:B5)`.
///
/// Captures:
/// - group 1: start cell ref (e.g. `A1`)
/// - group 2: end cell ref (e.g. `B5`)
pub fn sum_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bSUM\(\s*(\$?[A-Z]+\$?[0-9]+)\s*:\s*(\$?[A-Z]+\$?[0-9]+)\s*\)",
        )
        .expect("range sum regex must compile")
    })
}

/// Regex that matches a whole single-cell reference token.
///
/// Captures:
/// - group 1: column letters
/// - group 2: row number
pub fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$?\b([A-Za-z]+)\$?([0-9]+)\b")
            .expect("cell reference regex must compile")
    })
}

/// Parse a cell range like "A1:B5".
pub fn parse_range(range: &str) -> Option<RangeRef> {
    let (start, end) = range.split_once(':')?;
    let start = CellRef::from_str(start.trim())?;
    let end = CellRef::from_str(end.trim())?;
    Some(RangeRef::new(start, end))
}

/// Extract all cell references from a formula, expanding range sums.
/// Ranges larger than [`MAX_RANGE_CELLS`] are skipped.
pub fn extract_references(formula: &str) -> Vec<CellRef> {
    let formula = formula.strip_prefix('=').unwrap_or(formula);
    let mut deps = Vec::new();

    for caps in sum_range_re().captures_iter(formula) {
        if let (Some(start), Some(end)) = (CellRef::from_str(&caps[1]), CellRef::from_str(&caps[2])) {
            let range = RangeRef::new(start, end);
            match range.cell_count() {
                Some(n) if n <= MAX_RANGE_CELLS => deps.extend(range.cells()),
                _ => continue,
            }
        }
    }

    let without_ranges = sum_range_re().replace_all(formula, " ");
    for caps in cell_ref_re().captures_iter(&without_ranges) {
        let Some(col) = CellRef::letters_to_col(&caps[1]) else {
            continue;
        };
        if let Ok(row) = caps[2].parse::<usize>() {
            if row > 0 {
                deps.push(CellRef::new(col, row));
            }
        }
    }

    deps
}
