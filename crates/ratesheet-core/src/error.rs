//! Error types for Ratesheet core.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use ratesheet_engine::EvalError;

/// Errors that can occur while loading a rule table.
#[derive(Error, Debug)]
pub enum RatesheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unsupported rule-table format: {0}")]
    UnsupportedFormat(String),

    #[error(
        "Value and formula views are not aligned: values span {values_rows}x{values_cols}, formulas span {formula_rows}x{formula_cols}"
    )]
    ViewMismatch {
        values_rows: usize,
        values_cols: usize,
        formula_rows: usize,
        formula_cols: usize,
    },

    #[error("No workbook path configured")]
    NoWorkbookPath,
}

pub type Result<T> = std::result::Result<T, RatesheetError>;

/// Differentiator values a candidate row actually holds, for match diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    pub row: usize,
    pub values: BTreeMap<String, String>,
}

/// Why one selection of a calculate batch failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    UnknownNode,
    NoMatchingRow {
        inputs: BTreeMap<String, String>,
        candidates: Vec<CandidateRow>,
    },
    MissingCostColumn {
        label: String,
    },
    FormulaCycle {
        path: Vec<String>,
    },
    DepthExceeded {
        cell: String,
        max_depth: usize,
    },
    RangeTooLarge {
        range: String,
    },
}

impl From<EvalError> for FailureReason {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Cycle { path } => FailureReason::FormulaCycle {
                path: path.iter().map(|c| c.to_string()).collect(),
            },
            EvalError::DepthExceeded { cell, max_depth } => FailureReason::DepthExceeded {
                cell: cell.to_string(),
                max_depth,
            },
            EvalError::RangeTooLarge { range, .. } => FailureReason::RangeTooLarge { range },
        }
    }
}

/// A structured, user-visible failure for one selection of a batch.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("selection {index} ({node}): {message}")]
pub struct SelectionFailure {
    pub index: usize,
    pub node: String,
    pub message: String,
    #[serde(flatten)]
    pub reason: FailureReason,
}

impl SelectionFailure {
    pub fn new(index: usize, node: &str, message: impl Into<String>, reason: FailureReason) -> Self {
        SelectionFailure {
            index,
            node: node.to_string(),
            message: message.into(),
            reason,
        }
    }

    pub fn from_eval(index: usize, node: &str, err: EvalError) -> Self {
        let message = err.to_string();
        SelectionFailure::new(index, node, message, err.into())
    }
}
