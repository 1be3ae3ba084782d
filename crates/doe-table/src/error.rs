//! Table Error Types

use crate::value::DoeId;
use thiserror::Error;

/// Errors raised while building or checking experiment tables
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// Column length differs from the number of rows
    #[error("Column '{column}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Same experiment id appears twice in the design table
    #[error("Duplicate experiment id {0} in design table")]
    DuplicateKey(DoeId),

    /// Same column added twice
    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    /// Column required by the configuration is absent
    #[error("Missing column '{column}' in {table} table")]
    MissingColumn { table: &'static str, column: String },

    /// Observation row references an experiment absent from the design table
    #[error("Experiment {0} is referenced by observations but missing from the design table")]
    MissingDesignRow(DoeId),

    /// NaN or infinite value
    #[error("Non-finite value in column '{column}' at row {row}")]
    NonFinite { column: String, row: usize },
}
