//! ratesheet-core - rule-table model, quote operations and storage.

pub mod error;
pub mod layout;
pub mod quote;
pub mod rules;
pub mod service;
pub mod storage;
pub mod table;

pub use error::{FailureReason, RatesheetError, Result, SelectionFailure};
pub use layout::Layout;
pub use quote::{CalculationReport, NodeResult, Selection};
pub use rules::{FieldDescriptor, FieldKind, RouteListing};
pub use service::QuoteService;
pub use storage::{Workbook, load_workbook};
pub use table::RateTable;

pub use ratesheet_engine::engine::{CellRef, Grid};
