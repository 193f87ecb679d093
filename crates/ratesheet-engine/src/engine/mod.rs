//! Rule-table formula engine API.
//!
//! This module provides the computation engine behind cost recalculation:
//!
//! - [`Cell`], [`CellValue`], [`Grid`] - Immutable sheet storage (formula text + cached value per cell)
//! - [`CellRef`] - Cell reference parsing (A1 notation ↔ 1-based row/col indices)
//! - [`EvalPath`], [`detect_cycle`] - Circular reference detection
//! - [`extract_references`] - Parse formula references
//! - [`expand_sum_ranges`], [`substitute_cell_refs`] - Rewrite formulas into literal arithmetic
//! - [`evaluate_arithmetic`] - Safe evaluation of the rewritten arithmetic
//! - [`Recalculator`] - Recursive recalculation of a target cell under runtime inputs
//! - [`format_number`], [`format_amount`] - Format values for display

mod arith;
mod cell;
mod cell_ref;
mod cycle;
mod deps;
mod format;
mod preprocess;
mod recalc;

pub use arith::{ArithError, evaluate_arithmetic, is_allowed_char};
pub use cell::{Cell, CellValue, Grid, is_formula_text, parse_number};
pub use cell_ref::CellRef;
pub use cycle::{DEFAULT_MAX_DEPTH, EvalPath, detect_cycle, find_cycles};
pub use deps::{MAX_RANGE_CELLS, RangeRef, extract_references, parse_range};
pub use format::{format_amount, format_number};
pub use preprocess::{expand_sum_ranges, formula_body, literal, substitute_cell_refs};
pub use recalc::{Recalculator, RuntimeInputs};
