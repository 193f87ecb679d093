//! Header row discovery.

use ratesheet_engine::engine::Grid;
use std::collections::HashMap;

use crate::layout::Layout;

/// Where the header row is and which column each label sits in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderInfo {
    pub header_row: usize,
    pub columns: HashMap<String, usize>,
}

impl HeaderInfo {
    pub fn column(&self, label: &str) -> Option<usize> {
        self.columns.get(label).copied()
    }

    /// An empty map means no route schema is available.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Find the first row in the scan window holding both the From and To labels.
///
/// Fails soft: without such a row the fallback header row is returned with an
/// empty column map.
pub fn resolve_header(grid: &Grid, layout: &Layout) -> HeaderInfo {
    for row in 1..=layout.header_scan_rows {
        let labels: Vec<(usize, String)> = (1..=layout.header_scan_cols)
            .filter_map(|col| grid.label(row, col).map(|label| (col, label)))
            .collect();

        let has = |wanted: &str| labels.iter().any(|(_, l)| l == wanted);
        if has(&layout.from_label) && has(&layout.to_label) {
            // Later duplicates win, as a column map built left to right would.
            let columns = labels.into_iter().map(|(col, label)| (label, col)).collect();
            return HeaderInfo {
                header_row: row,
                columns,
            };
        }
    }

    HeaderInfo {
        header_row: layout.fallback_header_row,
        columns: HashMap::new(),
    }
}
