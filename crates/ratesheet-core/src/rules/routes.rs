//! Route discovery: grouping rule rows into route nodes.
//!
//! Every data row below the header names a lane with its From and To cells.
//! Rows sharing the same (from, to) pair are alternative fee arrangements for
//! one lane and are collected into a single [`RouteNode`], in table order.

use ratesheet_engine::engine::{CellRef, Grid};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::header::HeaderInfo;
use crate::layout::Layout;

/// One physical rule-table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub row: usize,
    pub from: String,
    pub to: String,
    /// Owner/operator column value, for display.
    pub own: String,
    /// Every other labelled, non-blank cell of the row.
    #[serde(skip)]
    pub aux_fields: BTreeMap<String, String>,
}

/// A deduplicated (from, to) lane with its candidate rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteNode {
    pub id: String,
    pub from: String,
    pub to: String,
    pub detail_rows: Vec<DetailRow>,
}

impl RouteNode {
    pub fn location(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

/// Identifier for the `n`th discovered node (0-based): A..Z, then AA, AB, ...
pub fn node_id(n: usize) -> String {
    CellRef::col_to_letters(n + 1)
}

/// Route nodes of one sheet, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct RouteIndex {
    nodes: Vec<RouteNode>,
    by_id: HashMap<String, usize>,
}

impl RouteIndex {
    /// Scan every row after the header. Returns an empty index when the header
    /// lacks the From or To column.
    pub fn build(grid: &Grid, header: &HeaderInfo, layout: &Layout) -> RouteIndex {
        let (Some(from_col), Some(to_col)) =
            (header.column(&layout.from_label), header.column(&layout.to_label))
        else {
            debug!(sheet = grid.name(), "no From/To columns, route index is empty");
            return RouteIndex::default();
        };
        let own_col = header.column(&layout.own_label).unwrap_or(layout.fallback_own_col);

        let mut index = RouteIndex::default();
        let mut by_pair: HashMap<(String, String), usize> = HashMap::new();

        for row in header.header_row + 1..=grid.max_row() {
            let from = grid.value(row, from_col);
            let to = grid.value(row, to_col);
            if from.is_blank() || to.is_blank() {
                continue;
            }
            let from = from.trimmed();
            let to = to.trimmed();

            let slot = *by_pair.entry((from.clone(), to.clone())).or_insert_with(|| {
                let id = node_id(index.nodes.len());
                index.by_id.insert(id.clone(), index.nodes.len());
                index.nodes.push(RouteNode {
                    id,
                    from: from.clone(),
                    to: to.clone(),
                    detail_rows: Vec::new(),
                });
                index.nodes.len() - 1
            });

            let aux_fields = header
                .columns
                .iter()
                .filter(|(_, col)| **col != from_col && **col != to_col)
                .filter_map(|(label, col)| {
                    let v = grid.value(row, *col);
                    (!v.is_blank()).then(|| (label.clone(), v.trimmed()))
                })
                .collect();

            index.nodes[slot].detail_rows.push(DetailRow {
                row,
                from,
                to,
                own: grid.value(row, own_col).to_string(),
                aux_fields,
            });
        }

        debug!(sheet = grid.name(), nodes = index.nodes.len(), "built route index");
        index
    }

    pub fn get(&self, id: &str) -> Option<&RouteNode> {
        self.by_id.get(id).map(|i| &self.nodes[*i])
    }

    pub fn nodes(&self) -> &[RouteNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One entry of a route listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub locations: Vec<String>,
    pub sheet_name: String,
    pub details: Vec<DetailRow>,
}

/// `listRoutes` result: node id -> summary, serialized as a map in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteListing {
    pub entries: Vec<(String, RouteSummary)>,
}

impl RouteListing {
    pub fn from_index(index: &RouteIndex, sheet_name: &str) -> RouteListing {
        let entries = index
            .nodes()
            .iter()
            .map(|node| {
                (
                    node.id.clone(),
                    RouteSummary {
                        locations: vec![node.location()],
                        sheet_name: sheet_name.to_string(),
                        details: node.detail_rows.clone(),
                    },
                )
            })
            .collect();
        RouteListing { entries }
    }

    pub fn get(&self, id: &str) -> Option<&RouteSummary> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RouteListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, summary) in &self.entries {
            map.serialize_entry(id, summary)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::header::resolve_header;

    #[test]
    fn test_node_ids_continue_past_z() {
        assert_eq!(node_id(0), "A");
        assert_eq!(node_id(25), "Z");
        assert_eq!(node_id(26), "AA");
        assert_eq!(node_id(27), "AB");
        assert_eq!(node_id(701), "ZZ");
        assert_eq!(node_id(702), "AAA");
    }

    #[test]
    fn test_identical_pairs_share_one_node() {
        let grid = Grid::new("Sheet")
            .with("A2", "From")
            .with("B2", "To")
            .with("A3", "HK")
            .with("B3", "SZ")
            .with("A4", " HK ")
            .with("B4", "SZ");
        let layout = Layout::default();
        let header = resolve_header(&grid, &layout);
        let index = RouteIndex::build(&grid, &header, &layout);
        assert_eq!(index.len(), 1);
        let node = index.get("A").unwrap();
        assert_eq!(node.detail_rows.iter().map(|d| d.row).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(node.location(), "HK -> SZ");
    }

    #[test]
    fn test_rows_with_blank_endpoints_are_skipped() {
        let grid = Grid::new("Sheet")
            .with("A1", "From")
            .with("B1", "To")
            .with("A2", "HK")
            .with("A3", "HK")
            .with("B3", "SZ")
            .with("B4", "GZ")
            .with("A5", "SZ")
            .with("B5", "HK");
        let layout = Layout::default();
        let header = resolve_header(&grid, &layout);
        let index = RouteIndex::build(&grid, &header, &layout);
        let ids: Vec<_> = index.nodes().iter().map(|n| (n.id.as_str(), n.location())).collect();
        assert_eq!(ids, vec![("A", "HK -> SZ".to_string()), ("B", "SZ -> HK".to_string())]);
    }

    #[test]
    fn test_missing_header_gives_empty_index() {
        let grid = Grid::new("Sheet").with("A1", "Origin").with("B1", "To");
        let layout = Layout::default();
        let header = resolve_header(&grid, &layout);
        assert!(RouteIndex::build(&grid, &header, &layout).is_empty());
    }

    #[test]
    fn test_own_and_aux_fields_are_captured() {
        let grid = Grid::new("Sheet")
            .with("A2", "Own")
            .with("B2", "From")
            .with("C2", "To")
            .with("D2", "Carrier")
            .with("A3", "WAHL")
            .with("B3", "HK")
            .with("C3", "SZ")
            .with("D3", "DHL");
        let layout = Layout::default();
        let header = resolve_header(&grid, &layout);
        let index = RouteIndex::build(&grid, &header, &layout);
        let row = &index.get("A").unwrap().detail_rows[0];
        assert_eq!(row.own, "WAHL");
        assert_eq!(row.aux_fields.get("Carrier").map(String::as_str), Some("DHL"));
        assert!(!row.aux_fields.contains_key("From"));
    }
}
