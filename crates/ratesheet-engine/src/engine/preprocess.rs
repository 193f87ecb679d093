//! Formula text rewriting.
//!
//! Before a formula can be handed to the arithmetic evaluator, every range sum
//! and cell reference in it must be replaced by a numeric literal:
//!
//! - **Range sums**: `SUM(B2:C5)` → the literal sum of the rectangle
//! - **Cell references**: `B5` → the literal value resolved for that cell
//!
//! Both passes work on whole tokens (a reference to row 1 never rewrites part
//! of a reference to row 10) and leave any text they do not understand alone,
//! so the arithmetic pass can reject it.

use super::cell_ref::CellRef;
use super::deps::{RangeRef, cell_ref_re, sum_range_re};

/// Strip the leading `=` and surrounding whitespace from formula text.
pub fn formula_body(formula: &str) -> &str {
    let trimmed = formula.trim();
    trimmed.strip_prefix('=').unwrap_or(trimmed).trim()
}

/// Render a number as an expression literal. Negative values are parenthesized
/// so they compose with any neighbouring operator.
pub fn literal(n: f64) -> String {
    if n < 0.0 {
        format!("({})", n)
    } else {
        format!("{}", n)
    }
}

/// Replace each `SUM(start:end)` with the literal returned by `sum` for that range.
pub fn expand_sum_ranges<E>(
    expr: &str,
    mut sum: impl FnMut(RangeRef) -> Result<f64, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;

    for caps in sum_range_re().captures_iter(expr) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let (Some(start), Some(end)) = (CellRef::from_str(&caps[1]), CellRef::from_str(&caps[2]))
        else {
            continue;
        };
        out.push_str(&expr[last..whole.start()]);
        out.push_str(&literal(sum(RangeRef::new(start, end))?));
        last = whole.end();
    }

    out.push_str(&expr[last..]);
    Ok(out)
}

/// Replace each whole cell-reference token with the literal returned by `value`.
pub fn substitute_cell_refs<E>(
    expr: &str,
    mut value: impl FnMut(CellRef) -> Result<f64, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;

    for caps in cell_ref_re().captures_iter(expr) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let Some(col) = CellRef::letters_to_col(&caps[1]) else {
            continue;
        };
        let Some(row) = caps[2].parse::<usize>().ok().filter(|r| *r > 0) else {
            continue;
        };
        out.push_str(&expr[last..whole.start()]);
        out.push_str(&literal(value(CellRef::new(col, row))?));
        last = whole.end();
    }

    out.push_str(&expr[last..]);
    Ok(out)
}
