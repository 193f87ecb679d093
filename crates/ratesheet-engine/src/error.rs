//! Error types for formula evaluation.

use thiserror::Error;

use crate::engine::CellRef;

/// Errors that abort the evaluation of a target cell.
///
/// Malformed arithmetic is not an error: it evaluates to 0.0 with a warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("circular reference: {}", format_path(.path))]
    Cycle { path: Vec<CellRef> },

    #[error("formula nesting deeper than {max_depth} at {cell}")]
    DepthExceeded { cell: CellRef, max_depth: usize },

    #[error("range {range} covers more than {limit} cells")]
    RangeTooLarge { range: String, limit: usize },
}

fn format_path(path: &[CellRef]) -> String {
    path.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, EvalError>;
