//! The quote operations over a swappable rule-table snapshot.
//!
//! Each call works on the table that was current when it started. `reload`
//! swaps in a new table without waiting for calls in flight; they finish on
//! the old one.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{RatesheetError, Result};
use crate::layout::Layout;
use crate::quote::{CalculationReport, Selection};
use crate::rules::{FieldDescriptor, RouteListing};
use crate::table::RateTable;

pub struct QuoteService {
    table: RwLock<Arc<RateTable>>,
}

impl QuoteService {
    pub fn new(table: RateTable) -> Self {
        QuoteService {
            table: RwLock::new(Arc::new(table)),
        }
    }

    /// The table current at the time of the call.
    pub fn snapshot(&self) -> Arc<RateTable> {
        self.table.read().clone()
    }

    pub fn list_routes(&self) -> RouteListing {
        self.snapshot().list_routes()
    }

    pub fn get_fields(&self, node: &str, current: &HashMap<String, String>) -> Vec<FieldDescriptor> {
        self.snapshot().get_fields(node, current)
    }

    pub fn calculate(&self, selections: &[Selection]) -> CalculationReport {
        self.snapshot().calculate(selections)
    }

    /// Replace the current table. The new table builds its route index on
    /// first use.
    pub fn reload(&self, table: RateTable) {
        let sheet = table.grid().name().to_string();
        *self.table.write() = Arc::new(table);
        info!(sheet = %sheet, "rule table reloaded");
    }

    /// Reload from the configured workbook path.
    pub fn load_builtin(&self, path: Option<&Path>, layout: Layout, max_depth: usize) -> Result<()> {
        let path = path.ok_or(RatesheetError::NoWorkbookPath)?;
        let table = RateTable::load(path, None, layout)?.with_max_depth(max_depth);
        self.reload(table);
        Ok(())
    }
}
