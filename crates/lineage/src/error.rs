//! Error types for lineage derivation.

use thiserror::Error;

use crate::record::FieldType;

/// Errors that can occur while loading or validating a lineage table.
#[derive(Debug, Error)]
pub enum LineageError {
    /// The table has no data rows
    #[error("Lineage table is empty")]
    EmptyInput,

    /// A cell is absent or null
    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue {
        /// Column holding the null cell
        column: String,
        /// 1-based data row (header excluded)
        row: usize,
    },

    /// A data row has more cells than the header has columns
    #[error("Row {row} has {found} cells, but the header has {expected} columns")]
    RaggedRow {
        /// 1-based data row (header excluded)
        row: usize,
        /// Header width
        expected: usize,
        /// Cells in the row
        found: usize,
    },

    /// The header does not match the required column set exactly
    #[error("Table columns do not match the required schema (missing: [{}], unexpected: [{}])", missing.join(", "), unexpected.join(", "))]
    SchemaMismatch {
        /// Required columns that are not present
        missing: Vec<String>,
        /// Present columns that are not part of the schema, or repeated
        unexpected: Vec<String>,
    },

    /// A column's inferred type differs from the required one
    #[error("Column '{column}' must be of type {expected}, but got {found}")]
    TypeMismatch {
        /// Offending column
        column: String,
        /// Required type
        expected: FieldType,
        /// Type inferred across all rows
        found: FieldType,
    },

    /// Reading the table file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table is not well-formed delimited text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Glossary definitions could not be parsed
    #[error("Invalid glossary definition: {0}")]
    Glossary(String),
}

impl LineageError {
    /// Returns the offending column, if the error is tied to one.
    pub fn column(&self) -> Option<&str> {
        match self {
            LineageError::MissingValue { column, .. } => Some(column),
            LineageError::TypeMismatch { column, .. } => Some(column),
            _ => None,
        }
    }

    /// Returns true if this error was raised by the record validator.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LineageError::EmptyInput
                | LineageError::MissingValue { .. }
                | LineageError::RaggedRow { .. }
                | LineageError::SchemaMismatch { .. }
                | LineageError::TypeMismatch { .. }
        )
    }
}

/// A specialized Result type for lineage operations.
pub type Result<T> = std::result::Result<T, LineageError>;
