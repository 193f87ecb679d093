//! Matching a selection to exactly one detail row.
//!
//! Phase one is strict: every supplied field with a known column must equal
//! the row's cell (both trimmed). When no row qualifies, phase two repeats the
//! scan ignoring runtime-input fields, whose values are quantities to price
//! rather than attributes to match. The first qualifying row in table order
//! wins. Fields that map to no column are ignored in both phases.

use ratesheet_engine::engine::Grid;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::header::HeaderInfo;
use super::routes::RouteNode;
use crate::error::CandidateRow;
use crate::layout::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    Strict,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMatch {
    pub row: usize,
    pub phase: MatchPhase,
}

/// No detail row satisfied either phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchFailure {
    pub inputs: BTreeMap<String, String>,
    pub candidates: Vec<CandidateRow>,
}

pub fn match_row(
    grid: &Grid,
    header: &HeaderInfo,
    layout: &Layout,
    node: &RouteNode,
    inputs: &BTreeMap<String, String>,
) -> Result<RowMatch, MatchFailure> {
    info!(node = %node.id, rows = node.detail_rows.len(), ?inputs, "matching selection");

    let row_matches = |row: usize, skip_runtime: bool| {
        inputs.iter().all(|(field, wanted)| {
            if skip_runtime && layout.is_runtime_input(field) {
                return true;
            }
            let Some(col) = header.column(field) else {
                return true;
            };
            let actual = grid.value(row, col).trimmed();
            let ok = actual == wanted.trim();
            if !ok {
                debug!(row, field = %field, actual = %actual, wanted = %wanted.trim(), "field differs");
            }
            ok
        })
    };

    for (phase, skip_runtime) in [(MatchPhase::Strict, false), (MatchPhase::Fallback, true)] {
        if let Some(d) = node.detail_rows.iter().find(|d| row_matches(d.row, skip_runtime)) {
            info!(node = %node.id, row = d.row, ?phase, "matched row");
            return Ok(RowMatch { row: d.row, phase });
        }
        if phase == MatchPhase::Strict {
            debug!(node = %node.id, "strict match failed, ignoring runtime inputs");
        }
    }

    let candidates = node
        .detail_rows
        .iter()
        .map(|d| CandidateRow {
            row: d.row,
            values: inputs
                .keys()
                .filter(|field| !layout.is_runtime_input(field))
                .filter_map(|field| {
                    let col = header.column(field)?;
                    Some((field.clone(), grid.value(d.row, col).trimmed()))
                })
                .collect(),
        })
        .collect();

    warn!(node = %node.id, ?inputs, "no row matches selection");
    Err(MatchFailure {
        inputs: inputs.clone(),
        candidates,
    })
}

impl MatchFailure {
    /// Human-readable diagnostic listing what each candidate row holds.
    pub fn describe(&self) -> String {
        let mut msg = String::from("no rule row matches the selected combination");
        for c in &self.candidates {
            let values = c
                .values
                .iter()
                .map(|(k, v)| format!("{}='{}'", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            msg.push_str(&format!("; row {}: {}", c.row, values));
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::header::resolve_header;
    use crate::rules::routes::RouteIndex;

    fn grid() -> Grid {
        Grid::new("Sheet")
            .with("A2", "From")
            .with("B2", "To")
            .with("C2", "Carrier")
            .with("D2", "pallet")
            .with("A3", "HK")
            .with("B3", "SZ")
            .with("C3", "DHL")
            .with("D3", "2")
            .with("A4", "HK")
            .with("B4", "SZ")
            .with("C4", "SF")
            .with("D4", "4")
    }

    fn run(pairs: &[(&str, &str)]) -> Result<RowMatch, MatchFailure> {
        let grid = grid();
        let layout = Layout::default();
        let header = resolve_header(&grid, &layout);
        let index = RouteIndex::build(&grid, &header, &layout);
        let inputs = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        match_row(&grid, &header, &layout, index.get("A").unwrap(), &inputs)
    }

    #[test]
    fn test_strict_match_on_all_fields() {
        assert_eq!(
            run(&[("Carrier", "SF"), ("pallet", "4")]),
            Ok(RowMatch { row: 4, phase: MatchPhase::Strict })
        );
    }

    #[test]
    fn test_fallback_ignores_runtime_inputs() {
        assert_eq!(
            run(&[("Carrier", " SF "), ("pallet", "99")]),
            Ok(RowMatch { row: 4, phase: MatchPhase::Fallback })
        );
    }

    #[test]
    fn test_first_row_wins_and_unknown_fields_are_ignored() {
        assert_eq!(
            run(&[("Colour", "red")]),
            Ok(RowMatch { row: 3, phase: MatchPhase::Strict })
        );
    }

    #[test]
    fn test_failure_lists_candidates() {
        let failure = run(&[("Carrier", "UPS"), ("pallet", "2")]).unwrap_err();
        assert_eq!(failure.candidates.len(), 2);
        assert_eq!(failure.candidates[0].values.get("Carrier").map(String::as_str), Some("DHL"));
        assert!(!failure.candidates[0].values.contains_key("pallet"));
        assert!(failure.describe().contains("row 4: Carrier='SF'"));
    }
}
