//! Feature Error Types

use doe_table::{DoeId, TableError};
use thiserror::Error;

/// Errors raised while building the registry or encoding features
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Bad or missing attribute declaration, malformed table, zero variance
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Categorical value never seen when the registry was built
    #[error("Unknown category '{value}' for attribute '{attribute}' (known values: {known})")]
    UnknownCategory {
        attribute: String,
        value: String,
        known: String,
    },

    /// Observation row whose experiment is absent from the design table
    #[error("Experiment {0} is referenced by observations but missing from the design table")]
    MissingDesignRow(DoeId),
}

impl From<TableError> for FeatureError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::MissingDesignRow(id) => FeatureError::MissingDesignRow(id),
            other => FeatureError::Configuration(other.to_string()),
        }
    }
}
