//! Dataset Builder
//!
//! Joins the design table onto the observation rows, encodes every expanded
//! row into the feature and target matrices, and partitions rows into
//! training and validation sets.

mod builder;
mod split;

pub use builder::{Dataset, DatasetBuilder};
pub use split::{Split, SplitConfig, ValidationMethod};

use doe_table::{DoeId, TableError};
use feature_engine::FeatureError;
use thiserror::Error;

/// Errors raised while building a dataset
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    /// Observation row whose experiment is absent from the design table
    #[error("Experiment {0} is referenced by observations but missing from the design table")]
    MissingDesignRow(DoeId),

    /// Invalid split settings or table/registry mismatch
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Encoding failure
    #[error(transparent)]
    Feature(FeatureError),
}

impl From<FeatureError> for DatasetError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::MissingDesignRow(id) => DatasetError::MissingDesignRow(id),
            other => DatasetError::Feature(other),
        }
    }
}

impl From<TableError> for DatasetError {
    fn from(err: TableError) -> Self {
        FeatureError::from(err).into()
    }
}
