//! Recalculation of one target cell under runtime inputs.
//!
//! A [`Recalculator`] re-evaluates a cell's formula as if the caller's runtime
//! values had been typed into the sheet:
//!
//! 1. `SUM(range)` is expanded cell by cell. Formula cells are recalculated,
//!    cells in a runtime-input column take the runtime value (whatever their
//!    row), other cells contribute their stored number.
//! 2. Each remaining reference is resolved. A reference to a runtime-input
//!    column on the formula's own row takes the runtime value, a formula cell
//!    is recalculated, anything else contributes its stored number.
//! 3. The literal expression left over goes through [`evaluate_arithmetic`].
//!
//! Column labels come from the sheet's header row. Results are memoized per
//! recalculator only; runtime inputs are fixed for its lifetime.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::arith::evaluate_arithmetic;
use super::cell::{CellValue, Grid};
use super::cell_ref::CellRef;
use super::cycle::{DEFAULT_MAX_DEPTH, EvalPath};
use super::deps::{MAX_RANGE_CELLS, RangeRef};
use super::preprocess::{expand_sum_ranges, formula_body, substitute_cell_refs};
use crate::error::{EvalError, Result};

/// Runtime-input label -> value supplied by the caller.
pub type RuntimeInputs = HashMap<String, f64>;

pub struct Recalculator<'g> {
    grid: &'g Grid,
    header_row: usize,
    inputs: &'g RuntimeInputs,
    path: EvalPath,
    memo: HashMap<CellRef, f64>,
}

impl<'g> Recalculator<'g> {
    pub fn new(grid: &'g Grid, header_row: usize, inputs: &'g RuntimeInputs) -> Recalculator<'g> {
        Recalculator {
            grid,
            header_row,
            inputs,
            path: EvalPath::new(DEFAULT_MAX_DEPTH),
            memo: HashMap::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Recalculator<'g> {
        self.path = EvalPath::new(max_depth);
        self
    }

    /// Evaluate a cell to a number.
    ///
    /// Cells without formula text return their stored value coerced to a
    /// number (0.0 when empty or non-numeric).
    pub fn evaluate_cell(&mut self, at: CellRef) -> Result<f64> {
        let grid = self.grid;
        let Some(formula) = grid.formula(at.row, at.col) else {
            return Ok(grid.value(at.row, at.col).to_f64_or_zero());
        };
        if let Some(value) = self.memo.get(&at) {
            return Ok(*value);
        }

        self.path.enter(at)?;
        let result = self.evaluate_formula(at, formula);
        self.path.leave(at);

        let value = result?;
        self.memo.insert(at, value);
        Ok(value)
    }

    /// Evaluate a cell keeping non-formula values as stored (text stays text).
    pub fn evaluate_value(&mut self, at: CellRef) -> Result<CellValue> {
        if self.grid.formula(at.row, at.col).is_some() {
            Ok(CellValue::Number(self.evaluate_cell(at)?))
        } else {
            Ok(self.grid.value(at.row, at.col).clone())
        }
    }

    fn evaluate_formula(&mut self, at: CellRef, formula: &'g str) -> Result<f64> {
        debug!(cell = %at, formula, depth = self.path.depth(), "recalculating formula");

        let body = formula_body(formula);
        let expanded = expand_sum_ranges(body, |range| self.sum_range(range))?;
        let substituted = substitute_cell_refs(&expanded, |r| self.resolve_reference(at, r))?;

        match evaluate_arithmetic(&substituted) {
            Ok(value) => {
                debug!(cell = %at, expr = %substituted, value, "formula evaluated");
                Ok(value)
            }
            Err(err) => {
                warn!(cell = %at, formula, expr = %substituted, error = %err, "unsafe or malformed expression, using 0");
                Ok(0.0)
            }
        }
    }

    fn sum_range(&mut self, range: RangeRef) -> Result<f64> {
        match range.cell_count() {
            Some(n) if n <= MAX_RANGE_CELLS => {}
            _ => {
                return Err(EvalError::RangeTooLarge {
                    range: format!("{}:{}", range.start, range.end),
                    limit: MAX_RANGE_CELLS,
                });
            }
        }

        let mut total = 0.0;
        for cell in range.cells() {
            let value = if self.grid.formula(cell.row, cell.col).is_some() {
                self.evaluate_cell(cell)?
            } else if let Some(input) = self.runtime_input(cell.col) {
                trace!(cell = %cell, value = input, "range cell takes runtime input");
                input
            } else {
                self.grid.value(cell.row, cell.col).to_f64_or_zero()
            };
            total += value;
        }

        debug!(range = %format!("{}:{}", range.start, range.end), total, "expanded range sum");
        Ok(total)
    }

    fn resolve_reference(&mut self, owner: CellRef, r: CellRef) -> Result<f64> {
        if r.row == owner.row {
            if let Some(input) = self.runtime_input(r.col) {
                debug!(cell = %r, value = input, "substituted runtime input");
                return Ok(input);
            }
        }
        if self.grid.formula(r.row, r.col).is_some() {
            let value = self.evaluate_cell(r)?;
            trace!(cell = %r, value, "substituted recalculated formula");
            return Ok(value);
        }
        let value = self.grid.value(r.row, r.col).to_f64_or_zero();
        trace!(cell = %r, value, "substituted stored value");
        Ok(value)
    }

    fn runtime_input(&self, col: usize) -> Option<f64> {
        let label = self.grid.label(self.header_row, col)?;
        self.inputs.get(&label).copied()
    }
}
