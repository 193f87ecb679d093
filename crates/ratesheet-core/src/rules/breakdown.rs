//! Line-item breakdown of a matched row.

use ratesheet_engine::EvalError;
use ratesheet_engine::engine::{CellRef, CellValue, Grid, Recalculator, format_amount};
use serde::Serialize;
use tracing::debug;

use crate::layout::Layout;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownItem {
    pub name: String,
    pub reference_rate: String,
    pub computed_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub base_items: Vec<BreakdownItem>,
}

/// Re-evaluate every cost-component column of `row` and list the ones that bill
/// something. Empty and zero results are left out.
pub fn build_breakdown(
    grid: &Grid,
    header_row: usize,
    layout: &Layout,
    row: usize,
    recalc: &mut Recalculator<'_>,
) -> Result<Breakdown, EvalError> {
    let mut base_items = Vec::new();

    for col in layout.breakdown_first_col..=layout.breakdown_last_col {
        let Some(name) = grid.label(header_row, col) else {
            continue;
        };

        let computed_value = match recalc.evaluate_value(CellRef::new(col, row))? {
            CellValue::Empty => continue,
            CellValue::Number(n) if n == 0.0 => continue,
            CellValue::Number(n) => format_amount(n),
            CellValue::Text(s) if s.trim().is_empty() => continue,
            CellValue::Text(s) => s,
        };

        let rate = grid.value(layout.rate_row, col);
        let reference_rate = if !rate.is_blank() {
            rate.to_string()
        } else {
            grid.formula(row, col).unwrap_or_default().to_string()
        };

        debug!(row, item = %name, value = %computed_value, "breakdown item");
        base_items.push(BreakdownItem {
            name,
            reference_rate,
            computed_value,
        });
    }

    Ok(Breakdown { base_items })
}
