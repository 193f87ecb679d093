use ratesheet_engine::engine::{CellRef, DEFAULT_MAX_DEPTH, Grid, Recalculator, find_cycles};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{info, info_span, warn};

use crate::error::{FailureReason, Result, SelectionFailure};
use crate::layout::Layout;
use crate::quote::{CalculationReport, NodeResult, Selection};
use crate::rules::{
    FieldDescriptor, HeaderInfo, RouteIndex, RouteListing, build_breakdown, classify_fields,
    match_row, resolve_header,
};
use crate::storage::{Workbook, load_workbook, merge_views, parse_csv};

/// One loaded rule table: the sheet, its layout, and the route index built
/// lazily on first use.
///
/// A table is immutable once built. Reloading the workbook means building a
/// new table, which also discards the route index.
pub struct RateTable {
    /// The rule-table sheet (shared; clones are cheap)
    grid: Arc<Grid>,
    /// Labels and column windows of the sheet
    layout: Layout,
    /// Bound on nested formula evaluation
    max_depth: usize,
    header: OnceLock<HeaderInfo>,
    routes: OnceLock<RouteIndex>,
}

impl RateTable {
    pub fn new(grid: Grid, layout: Layout) -> Self {
        RateTable {
            grid: Arc::new(grid),
            layout,
            max_depth: DEFAULT_MAX_DEPTH,
            header: OnceLock::new(),
            routes: OnceLock::new(),
        }
    }

    /// A table with no sheet. Every operation returns an empty result.
    pub fn empty(layout: Layout) -> Self {
        let name = layout.sheet_name.clone();
        RateTable::new(Grid::new(name), layout)
    }

    /// Build a table from the workbook sheet named by the layout. When that
    /// sheet is absent the first sheet is used, which lists no routes.
    pub fn from_workbook(mut workbook: Workbook, layout: Layout) -> Self {
        if let Some(grid) = workbook.take_sheet(&layout.sheet_name) {
            return RateTable::new(grid, layout);
        }
        warn!(expected = %layout.sheet_name, sheets = workbook.sheets.len(), "rule-table sheet not found");
        match workbook.sheets.into_iter().next() {
            Some(grid) => RateTable::new(grid, layout),
            None => RateTable::empty(layout),
        }
    }

    /// Load a table from disk. `values` optionally names a CSV holding the
    /// cached values of the formula cells in `path`.
    pub fn load(path: &Path, values: Option<&Path>, layout: Layout) -> Result<Self> {
        let mut workbook = load_workbook(path, &layout.sheet_name)?;
        if let Some(values_path) = values {
            let values = parse_csv(values_path, &layout.sheet_name)?;
            if let Some(formulas) = workbook.take_sheet(&layout.sheet_name) {
                workbook.sheets.insert(0, merge_views(formulas, &values)?);
            }
        }
        info!(path = %path.display(), sheet = %layout.sheet_name, "loaded rule table");
        Ok(RateTable::from_workbook(workbook, layout))
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn header(&self) -> &HeaderInfo {
        self.header
            .get_or_init(|| resolve_header(&self.grid, &self.layout))
    }

    pub fn route_index(&self) -> &RouteIndex {
        self.routes.get_or_init(|| {
            if self.grid.name() != self.layout.sheet_name {
                warn!(
                    sheet = self.grid.name(),
                    expected = %self.layout.sheet_name,
                    "rule-table sheet not loaded"
                );
                return RouteIndex::default();
            }
            RouteIndex::build(&self.grid, self.header(), &self.layout)
        })
    }

    /// `listRoutes`: every route node with its locations and sheet name.
    pub fn list_routes(&self) -> RouteListing {
        RouteListing::from_index(self.route_index(), self.grid.name())
    }

    /// `getFields`: field descriptors of a node. Unknown nodes have none.
    pub fn get_fields(&self, node: &str, current: &HashMap<String, String>) -> Vec<FieldDescriptor> {
        let Some(route) = self.route_index().get(node) else {
            return Vec::new();
        };
        classify_fields(&self.grid, self.header(), &self.layout, route, current)
    }

    /// `calculate`: price every selection independently. A failing selection is
    /// reported in `failures` and does not affect the others.
    pub fn calculate(&self, selections: &[Selection]) -> CalculationReport {
        let _span = info_span!("calculate", sheet = self.grid.name(), selections = selections.len()).entered();
        info!("calculation start");

        let mut report = CalculationReport::default();
        for (index, selection) in selections.iter().enumerate() {
            match self.calculate_one(index, selection) {
                Ok(result) => {
                    info!(section = index + 1, node = %result.node, cost = result.cost, "section priced");
                    report.total_cost += result.cost;
                    report.node_results.push(result);
                }
                Err(failure) => {
                    warn!(section = index + 1, error = %failure, "section failed");
                    report.failures.push(failure);
                }
            }
        }

        info!(total = report.total_cost, failed = report.failures.len(), "calculation end");
        report
    }

    fn calculate_one(
        &self,
        index: usize,
        selection: &Selection,
    ) -> std::result::Result<NodeResult, SelectionFailure> {
        let node_id = selection.node.as_str();
        let Some(route) = self.route_index().get(node_id) else {
            return Err(SelectionFailure::new(
                index,
                node_id,
                format!("unknown route node '{}'", node_id),
                FailureReason::UnknownNode,
            ));
        };

        let header = self.header();
        let matched = match_row(&self.grid, header, &self.layout, route, &selection.inputs).map_err(|f| {
            SelectionFailure::new(
                index,
                node_id,
                f.describe(),
                FailureReason::NoMatchingRow {
                    inputs: f.inputs,
                    candidates: f.candidates,
                },
            )
        })?;

        let Some(cost_col) = header.column(&self.layout.total_cost_label) else {
            return Err(SelectionFailure::new(
                index,
                node_id,
                format!("no '{}' column in the header", self.layout.total_cost_label),
                FailureReason::MissingCostColumn {
                    label: self.layout.total_cost_label.clone(),
                },
            ));
        };

        let inputs = selection.runtime_inputs(&self.layout);
        let mut recalc =
            Recalculator::new(&self.grid, header.header_row, &inputs).with_max_depth(self.max_depth);
        let cost = recalc
            .evaluate_cell(CellRef::new(cost_col, matched.row))
            .map_err(|e| SelectionFailure::from_eval(index, node_id, e))?;
        let breakdown = build_breakdown(&self.grid, header.header_row, &self.layout, matched.row, &mut recalc)
            .map_err(|e| SelectionFailure::from_eval(index, node_id, e))?;

        Ok(NodeResult {
            node: node_id.to_string(),
            row: matched.row,
            phase: matched.phase,
            cost,
            breakdown,
        })
    }

    /// Formula cycles anywhere in the sheet, for authoring checks.
    pub fn find_cycles(&self) -> Vec<Vec<CellRef>> {
        find_cycles(&self.grid)
    }
}
