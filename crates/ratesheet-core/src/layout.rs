//! Sheet layout constants.
//!
//! The rule table is authored by hand, so its shape is described by labels
//! and column windows rather than a schema. Every value has a default that
//! matches the warehouse fee sheet; a config file may override any of them.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    /// Sheet that holds the rule table.
    pub sheet_name: String,
    /// Rows (1-based, inclusive) scanned for the header row.
    pub header_scan_rows: usize,
    /// Columns read per row while scanning for the header row.
    pub header_scan_cols: usize,
    /// Header row assumed when no row in the scan window qualifies.
    pub fallback_header_row: usize,
    pub from_label: String,
    pub to_label: String,
    pub own_label: String,
    pub method_label: String,
    pub total_cost_label: String,
    pub invoice_label: String,
    /// Runtime-input labels, in the order they are exposed.
    pub runtime_inputs: Vec<String>,
    pub fallback_own_col: usize,
    pub fallback_invoice_col: usize,
    /// Cost-component columns re-evaluated for the breakdown (inclusive).
    pub breakdown_first_col: usize,
    pub breakdown_last_col: usize,
    /// Row holding the reference rate text of each cost column.
    pub rate_row: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            sheet_name: "WAHL WH fee".to_string(),
            header_scan_rows: 5,
            header_scan_cols: 19,
            fallback_header_row: 2,
            from_label: "From".to_string(),
            to_label: "To".to_string(),
            own_label: "Own".to_string(),
            method_label: "Method".to_string(),
            total_cost_label: "TOTAL Cost(HKD)".to_string(),
            invoice_label: "total invoice value (RMB)".to_string(),
            runtime_inputs: [
                "Import Truck times",
                "Export Truck times",
                "pallet",
                "CBM",
                "Month Qty",
                "total invoice value (RMB)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_own_col: 1,
            fallback_invoice_col: 12,
            breakdown_first_col: 13,
            breakdown_last_col: 25,
            rate_row: 3,
        }
    }
}

impl Layout {
    pub fn is_runtime_input(&self, label: &str) -> bool {
        self.runtime_inputs.iter().any(|l| l == label)
    }

    /// Labels never offered as differentiators.
    pub fn is_reserved(&self, label: &str) -> bool {
        [
            &self.from_label,
            &self.to_label,
            &self.method_label,
            &self.total_cost_label,
        ]
        .iter()
        .any(|l| l.as_str() == label)
    }
}

/// True for the "N/A" placeholder the sheet uses for not-applicable cells.
pub(crate) fn is_not_applicable(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("N/A")
}
