//! Field classification for a route node.
//!
//! Columns between the Own column and the invoice-value column split into two
//! kinds:
//! - *differentiators*: fixed attributes of a row (carrier, service level, ...).
//!   Their option list is every value found across the node's rows and never
//!   depends on what the caller has selected so far.
//! - *runtime inputs*: the fixed set of quantity fields. One is exposed when a
//!   row still in play has a value for it; the first such row's value is
//!   offered as a prefill.

use ratesheet_engine::engine::Grid;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::header::HeaderInfo;
use super::routes::{DetailRow, RouteNode};
use crate::layout::{Layout, is_not_applicable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Select,
    Input,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub display_name: String,
    pub options: Vec<String>,
    pub kind: FieldKind,
}

/// A differentiator column and all of its values across one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Differentiator {
    pub name: String,
    pub col: usize,
    pub all_options: Vec<String>,
}

/// Differentiator columns of `node`, left to right.
pub fn differentiators(
    grid: &Grid,
    header: &HeaderInfo,
    layout: &Layout,
    node: &RouteNode,
) -> Vec<Differentiator> {
    let own_col = header.column(&layout.own_label).unwrap_or(layout.fallback_own_col);
    let invoice_col = header
        .column(&layout.invoice_label)
        .unwrap_or(layout.fallback_invoice_col);

    let mut out = Vec::new();
    for col in own_col..=invoice_col {
        let Some(name) = grid.label(header.header_row, col) else {
            continue;
        };
        if layout.is_reserved(&name) || layout.is_runtime_input(&name) {
            continue;
        }

        let values: BTreeSet<String> = node
            .detail_rows
            .iter()
            .map(|d| grid.value(d.row, col).trimmed())
            .filter(|v| !v.is_empty() && !is_not_applicable(v))
            .collect();
        if values.is_empty() {
            continue;
        }

        debug!(node = %node.id, field = %name, options = values.len(), "differentiator");
        out.push(Differentiator {
            name,
            col,
            all_options: values.into_iter().collect(),
        });
    }
    out
}

/// Rows still consistent with the caller's differentiator selections.
///
/// A conflicting combination that leaves no rows falls back to every row of
/// the node.
pub fn effective_rows<'n>(
    grid: &Grid,
    node: &'n RouteNode,
    diffs: &[Differentiator],
    current: &HashMap<String, String>,
) -> Vec<&'n DetailRow> {
    let mut rows: Vec<&DetailRow> = node.detail_rows.iter().collect();
    for diff in diffs {
        let Some(wanted) = current.get(&diff.name).map(|v| v.trim()) else {
            continue;
        };
        if wanted.is_empty() {
            continue;
        }
        let before = rows.len();
        rows.retain(|d| grid.value(d.row, diff.col).trimmed() == wanted);
        debug!(node = %node.id, field = %diff.name, value = wanted, before, after = rows.len(), "narrowed rows");
    }

    if rows.is_empty() {
        debug!(node = %node.id, "selections conflict, using all rows");
        node.detail_rows.iter().collect()
    } else {
        rows
    }
}

/// Field descriptors for `node`: differentiators first, then exposed runtime inputs.
pub fn classify_fields(
    grid: &Grid,
    header: &HeaderInfo,
    layout: &Layout,
    node: &RouteNode,
    current: &HashMap<String, String>,
) -> Vec<FieldDescriptor> {
    let diffs = differentiators(grid, header, layout, node);

    let mut fields: Vec<FieldDescriptor> = diffs
        .iter()
        .map(|d| FieldDescriptor {
            name: d.name.clone(),
            display_name: d.name.clone(),
            options: d.all_options.clone(),
            kind: FieldKind::Select,
        })
        .collect();

    let rows = effective_rows(grid, node, &diffs, current);
    for label in &layout.runtime_inputs {
        let Some(col) = header.column(label) else {
            continue;
        };
        let has_value = rows.iter().any(|d| {
            let v = grid.value(d.row, col);
            !v.is_blank() && !is_not_applicable(&v.trimmed())
        });
        if !has_value {
            continue;
        }

        let prefill = rows
            .first()
            .map(|d| grid.value(d.row, col))
            .filter(|v| !v.is_blank())
            .map(|v| vec![v.to_string()])
            .unwrap_or_default();
        fields.push(FieldDescriptor {
            name: label.clone(),
            display_name: label.clone(),
            options: prefill,
            kind: FieldKind::Input,
        });
    }

    fields
}
