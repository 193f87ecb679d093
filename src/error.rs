//! Command-line usage errors

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum UsageError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("No command given")]
    MissingCommand,
}
