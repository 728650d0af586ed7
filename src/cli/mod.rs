//! CLI support for buildcond
//!
//! Provides programmatic access to the `bcond` commands for embedding in
//! other tools.

mod check;
mod convert;
mod tokens;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{conditioned_to_json, json_to_state, parse_assignment};
pub use tokens::execute_tokens;

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Lex error: {0}")]
    Lex(#[from] crate::LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The state document has the wrong shape
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Expected NAME=VALUE, found '{0}'")]
    InvalidAssignment(String),
}
