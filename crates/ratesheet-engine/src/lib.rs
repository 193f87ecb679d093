//! ratesheet_engine - Rule-table grid + formula recalculation.

pub mod engine;
pub mod error;

pub use error::{EvalError, Result};
