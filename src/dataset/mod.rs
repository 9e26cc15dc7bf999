//! Tabular datasets
//!
//! Reading uploaded CSV and Excel files: schema inspection for target-column
//! selection and full-scan analysis of a chosen target.

pub mod analysis;
pub mod inspector;
pub mod table;

use thiserror::Error;

pub use analysis::analyze;
pub use inspector::{inspect, inspect_with};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Dataset has no header row")]
    NoHeader,
    #[error("Dataset declares zero columns")]
    NoColumns,
    #[error("Column {0} has a blank header")]
    BlankHeader(usize),
    #[error("Duplicate column name '{0}'")]
    DuplicateHeader(String),
    #[error("Malformed row at line {line}: expected {expected} fields, found {found}")]
    Malformed { line: u64, expected: u64, found: u64 },
    #[error("Target column '{column}' not found in dataset. Available columns: {available}")]
    UnknownColumn { column: String, available: String },
    #[error("Unsupported dataset format '{0}'. Supported formats: .csv, .xlsx, .xls")]
    Unsupported(String),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Excel error: {0}")]
    Excel(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => ParseError::Malformed {
                line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
                expected: *expected_len,
                found: *len,
            },
            csv::ErrorKind::Io(e) => ParseError::Io(std::io::Error::new(e.kind(), e.to_string())),
            _ => ParseError::Csv(err.to_string()),
        }
    }
}

impl From<calamine::Error> for ParseError {
    fn from(err: calamine::Error) -> Self {
        ParseError::Excel(err.to_string())
    }
}
