//! CLI support for mql-lang
//!
//! Provides programmatic access to the mql CLI functionality for embedding
//! in other tools.

mod compile;
mod convert;
mod docs;

pub use compile::{CompileCommand, CompileResult, execute_compile};
pub use convert::{compiled_to_json, value_to_json};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Filter rejected by the parser
    #[error("Parse error: {0}")]
    Parse(crate::MqlError),
    /// Filter rejected while compiling
    #[error("Compile error: {0}")]
    Compile(crate::MqlError),
    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// No filter provided
    #[error("No filter provided. Pass it as an argument or pipe JSON to stdin.")]
    NoInput,
    /// Unknown documentation category
    #[error("Unknown category: '{0}'\nRun 'mql docs' to see available categories.")]
    UnknownCategory(String),
}
