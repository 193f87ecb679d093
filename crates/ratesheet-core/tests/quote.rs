//! End-to-end quotes over the sample warehouse fee sheet.

use pretty_assertions::assert_eq;
use ratesheet_core::rules::{BreakdownItem, MatchPhase};
use ratesheet_core::storage::parse_grd_content;
use ratesheet_core::{CellRef, FailureReason, FieldKind, Grid, Layout, QuoteService, RateTable, Selection};
use std::collections::HashMap;

const WH_FEE: &str = include_str!("../../../tests/fixtures/wh_fee.grd");
const CYCLE: &str = include_str!("../../../tests/fixtures/cycle.grd");

fn table(content: &str) -> RateTable {
    let workbook = parse_grd_content(content, "Sheet1").unwrap();
    RateTable::from_workbook(workbook, Layout::default())
}

fn current(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_routes_group_rows_by_lane() {
    let listing = table(WH_FEE).list_routes();
    assert_eq!(listing.len(), 2);

    let a = listing.get("A").unwrap();
    assert_eq!(a.locations, vec!["HK -> SZ"]);
    assert_eq!(a.sheet_name, "WAHL WH fee");
    assert_eq!(a.details.iter().map(|d| d.row).collect::<Vec<_>>(), vec![4, 5]);
    assert_eq!(a.details[0].own, "WAHL");

    assert_eq!(listing.get("B").unwrap().locations, vec!["SZ -> HK"]);
}

#[test]
fn test_route_listing_json_shape() {
    let json = serde_json::to_value(table(WH_FEE).list_routes()).unwrap();
    assert_eq!(
        json["B"],
        serde_json::json!({
            "locations": ["SZ -> HK"],
            "sheetName": "WAHL WH fee",
            "details": [{"row": 6, "from": "SZ", "to": "HK", "own": "WAHL"}],
        })
    );
}

#[test]
fn test_other_sheet_lists_no_routes() {
    let workbook = parse_grd_content(WH_FEE, "Sheet1").unwrap();
    let layout = Layout {
        sheet_name: "Cover".into(),
        ..Layout::default()
    };
    let table = RateTable::from_workbook(workbook, layout);
    assert!(table.list_routes().is_empty());

    let renamed = Layout {
        sheet_name: "Missing".into(),
        ..Layout::default()
    };
    let workbook = parse_grd_content(WH_FEE, "Sheet1").unwrap();
    assert!(RateTable::from_workbook(workbook, renamed).list_routes().is_empty());
}

#[test]
fn test_fields_for_node() {
    let table = table(WH_FEE);
    let fields = table.get_fields("A", &HashMap::new());

    let selects: Vec<(&str, Vec<String>)> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::Select)
        .map(|f| (f.name.as_str(), f.options.clone()))
        .collect();
    assert_eq!(
        selects,
        vec![
            ("Own", vec!["WAHL".to_string()]),
            ("Carrier", vec!["DHL".to_string(), "SF".to_string()]),
            ("Service", vec!["Economy".to_string(), "Express".to_string()]),
        ]
    );

    let inputs: Vec<(&str, Vec<String>)> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::Input)
        .map(|f| (f.name.as_str(), f.options.clone()))
        .collect();
    assert_eq!(
        inputs,
        vec![
            ("pallet", vec!["2".to_string()]),
            ("CBM", vec![]),
            ("Month Qty", vec![]),
        ]
    );
}

#[test]
fn test_fields_narrow_inputs_but_not_options() {
    let table = table(WH_FEE);
    let all = table.get_fields("A", &HashMap::new());
    let sf = table.get_fields("A", &current(&[("Carrier", "SF")]));

    let selects = |fields: &[ratesheet_core::FieldDescriptor]| {
        fields
            .iter()
            .filter(|f| f.kind == FieldKind::Select)
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(selects(&all), selects(&sf));

    let inputs: Vec<(&str, Vec<String>)> = sf
        .iter()
        .filter(|f| f.kind == FieldKind::Input)
        .map(|f| (f.name.as_str(), f.options.clone()))
        .collect();
    assert_eq!(
        inputs,
        vec![("CBM", vec!["10".to_string()]), ("Month Qty", vec!["1".to_string()])]
    );
}

#[test]
fn test_unknown_node_has_no_fields() {
    assert!(table(WH_FEE).get_fields("ZZ", &HashMap::new()).is_empty());
}

#[test]
fn test_calculate_substitutes_runtime_inputs() {
    let report = table(WH_FEE).calculate(&[Selection::new(
        "A",
        &[
            ("Carrier", "DHL"),
            ("Service", "Express"),
            ("pallet", "4"),
            ("total invoice value (RMB)", "1000"),
        ],
    )]);

    assert!(report.is_complete());
    let result = &report.node_results[0];
    assert_eq!(result.row, 4);
    assert_eq!(result.phase, MatchPhase::Fallback);
    assert!((result.cost - 49.0).abs() < 1e-9);
    assert_eq!(
        result.breakdown.base_items,
        vec![
            BreakdownItem {
                name: "Handling".into(),
                reference_rate: "12/pallet".into(),
                computed_value: "48.00".into(),
            },
            BreakdownItem {
                name: "Insurance".into(),
                reference_rate: "0.1% of invoice".into(),
                computed_value: "1.00".into(),
            },
        ]
    );
}

#[test]
fn test_calculate_strict_match_uses_stored_quantities() {
    let report = table(WH_FEE).calculate(&[Selection::new(
        "A",
        &[("Carrier", "SF"), ("CBM", "10"), ("Month Qty", "1")],
    )]);
    let result = &report.node_results[0];
    assert_eq!((result.row, result.phase), (5, MatchPhase::Strict));
    assert_eq!(result.cost, 300.0);
    assert_eq!(result.breakdown.base_items.len(), 1);
    assert_eq!(result.breakdown.base_items[0].computed_value, "300.00");
}

#[test]
fn test_batch_keeps_going_past_failures() {
    let report = table(WH_FEE).calculate(&[
        Selection::new("B", &[("Carrier", "DHL"), ("pallet", "3")]),
        Selection::new("Q", &[]),
        Selection::new("A", &[("Carrier", "UPS")]),
        Selection::new("A", &[("Carrier", "SF"), ("CBM", "10"), ("Month Qty", "2")]),
    ]);

    assert_eq!(
        report.node_results.iter().map(|r| (r.node.as_str(), r.cost)).collect::<Vec<_>>(),
        vec![("B", 54.0), ("A", 600.0)]
    );
    assert_eq!(report.total_cost, 654.0);

    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].reason, FailureReason::UnknownNode);
    assert_eq!(report.failures[1].index, 2);
    match &report.failures[1].reason {
        FailureReason::NoMatchingRow { candidates, .. } => {
            let carriers: Vec<_> = candidates
                .iter()
                .map(|c| c.values.get("Carrier").cloned().unwrap_or_default())
                .collect();
            assert_eq!(carriers, vec!["DHL", "SF"]);
        }
        other => panic!("expected no_matching_row, got {:?}", other),
    }
}

#[test]
fn test_report_json_shape() {
    let report = table(WH_FEE).calculate(&[
        Selection::new("B", &[("pallet", "1")]),
        Selection::new("Q", &[]),
    ]);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["totalCost"], serde_json::json!(18.0));
    assert_eq!(json["nodeResults"][0]["phase"], "strict");
    assert_eq!(
        json["nodeResults"][0]["breakdown"]["baseItems"][1],
        serde_json::json!({
            "name": "Storage",
            "referenceRate": "30/CBM/month",
            "computedValue": "6.00",
        })
    );
    assert_eq!(json["failures"][0]["kind"], "unknown_node");
    assert_eq!(json["failures"][0]["node"], "Q");
}

#[test]
fn test_cycle_fails_only_its_selection() {
    let table = table(CYCLE);
    let report = table.calculate(&[Selection::new("A", &[])]);
    assert!(report.node_results.is_empty());
    assert_eq!(
        report.failures[0].reason,
        FailureReason::FormulaCycle {
            path: vec!["K3".into(), "M3".into(), "K3".into()],
        }
    );
    assert_eq!(table.find_cycles().len(), 1);
}

#[test]
fn test_depth_bound_from_table() {
    let grid = Grid::new("WAHL WH fee")
        .with("A1", "From")
        .with("B1", "To")
        .with("C1", "TOTAL Cost(HKD)")
        .with("A2", "HK")
        .with("B2", "SZ")
        .with("C2", "=D2")
        .with("D2", "=E2")
        .with("E2", "=F2")
        .with("F2", "7");
    let shallow = RateTable::new(grid.clone(), Layout::default()).with_max_depth(2);
    let report = shallow.calculate(&[Selection::new("A", &[])]);
    assert!(matches!(
        report.failures[0].reason,
        FailureReason::DepthExceeded { max_depth: 2, .. }
    ));

    let deep = RateTable::new(grid, Layout::default());
    assert_eq!(deep.calculate(&[Selection::new("A", &[])]).total_cost, 7.0);
}

#[test]
fn test_default_depth_prices_long_chain() {
    let mut grid = Grid::new("WAHL WH fee")
        .with("A1", "From")
        .with("B1", "To")
        .with("C1", "TOTAL Cost(HKD)")
        .with("A2", "HK")
        .with("B2", "SZ")
        .with("C2", "=D2+1");
    // D2 .. BU2 each add one to the next column, BV2 ends the chain
    for col in 4..74 {
        let here = format!("{}2", CellRef::col_to_letters(col));
        let next = format!("={}2+1", CellRef::col_to_letters(col + 1));
        grid = grid.with(&here, &next);
    }
    grid = grid.with(&format!("{}2", CellRef::col_to_letters(74)), "0");

    let report = RateTable::new(grid, Layout::default()).calculate(&[Selection::new("A", &[])]);
    assert!(report.is_complete());
    assert_eq!(report.total_cost, 71.0);
}

#[test]
fn test_oversized_range_fails_only_its_selection() {
    let grid = Grid::new("WAHL WH fee")
        .with("A1", "From")
        .with("B1", "To")
        .with("C1", "TOTAL Cost(HKD)")
        .with("A2", "HK")
        .with("B2", "SZ")
        .with("C2", "=SUM(D1:D1000001)")
        .with("A3", "SZ")
        .with("B3", "HK")
        .with("C3", "=2+3");
    let report = RateTable::new(grid, Layout::default())
        .calculate(&[Selection::new("A", &[]), Selection::new("B", &[])]);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 0);
    assert_eq!(
        report.failures[0].reason,
        FailureReason::RangeTooLarge {
            range: "D1:D1000001".into()
        }
    );
    assert_eq!(report.node_results.len(), 1);
    assert_eq!(report.node_results[0].node, "B");
    assert_eq!(report.total_cost, 5.0);
}

#[test]
fn test_missing_cost_column() {
    let grid = Grid::new("WAHL WH fee")
        .with("A1", "From")
        .with("B1", "To")
        .with("A2", "HK")
        .with("B2", "SZ");
    let report = RateTable::new(grid, Layout::default()).calculate(&[Selection::new("A", &[])]);
    assert_eq!(
        report.failures[0].reason,
        FailureReason::MissingCostColumn {
            label: "TOTAL Cost(HKD)".into()
        }
    );
}

#[test]
fn test_service_reload_swaps_table() {
    let service = QuoteService::new(RateTable::empty(Layout::default()));
    assert!(service.list_routes().is_empty());
    service.reload(table(WH_FEE));
    assert_eq!(service.list_routes().len(), 2);
}
