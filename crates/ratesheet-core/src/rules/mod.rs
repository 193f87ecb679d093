//! Rule discovery over a loaded sheet (UI-agnostic).
//!
//! Leaf first: [`header`] finds the header row, [`routes`] groups rows into
//! route nodes, [`fields`] classifies a node's columns, [`matcher`] picks the
//! row for a selection and [`breakdown`] itemizes its cost.

pub mod breakdown;
pub mod fields;
pub mod header;
pub mod matcher;
pub mod routes;

pub use breakdown::{Breakdown, BreakdownItem, build_breakdown};
pub use fields::{Differentiator, FieldDescriptor, FieldKind, classify_fields, differentiators, effective_rows};
pub use header::{HeaderInfo, resolve_header};
pub use matcher::{MatchFailure, MatchPhase, RowMatch, match_row};
pub use routes::{DetailRow, RouteIndex, RouteListing, RouteNode, RouteSummary, node_id};
