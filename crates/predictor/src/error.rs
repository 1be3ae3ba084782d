//! Predictor Error Types

use autotune::AutotuneError;
use dataset::DatasetError;
use doe_table::{DoeId, TableError};
use feature_engine::FeatureError;
use inference_engine::ModelError;
use std::path::PathBuf;
use thiserror::Error;

/// Missing prerequisite of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotReady {
    #[error("no data or configuration loaded")]
    DataNotLoaded,
    #[error("no trained or loaded model")]
    ModelMissing,
}

/// Predictor errors
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Bad attribute declaration, wrong position arity, width mismatch
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown category '{value}' for attribute '{attribute}' (known values: {known})")]
    UnknownCategory {
        attribute: String,
        value: String,
        known: String,
    },

    #[error("Experiment {0} is referenced by observations but missing from the design table")]
    MissingDesignRow(DoeId),

    /// Operation called before its prerequisites; nothing was changed
    #[error("Predictor not ready: {0}")]
    NotReady(#[from] NotReady),

    #[error("Experiment {0} is not part of the loaded data")]
    UnknownExperiment(DoeId),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<FeatureError> for PredictorError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::Configuration(msg) => PredictorError::Configuration(msg),
            FeatureError::UnknownCategory {
                attribute,
                value,
                known,
            } => PredictorError::UnknownCategory {
                attribute,
                value,
                known,
            },
            FeatureError::MissingDesignRow(id) => PredictorError::MissingDesignRow(id),
        }
    }
}

impl From<DatasetError> for PredictorError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::MissingDesignRow(id) => PredictorError::MissingDesignRow(id),
            DatasetError::Configuration(msg) => PredictorError::Configuration(msg),
            DatasetError::Feature(err) => err.into(),
        }
    }
}

impl From<TableError> for PredictorError {
    fn from(err: TableError) -> Self {
        FeatureError::from(err).into()
    }
}

impl From<AutotuneError> for PredictorError {
    fn from(err: AutotuneError) -> Self {
        match err {
            AutotuneError::Configuration(msg) => PredictorError::Configuration(msg),
            AutotuneError::Model(err) => PredictorError::Model(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattened_conversions() {
        let err: PredictorError = DatasetError::MissingDesignRow(7).into();
        assert!(matches!(err, PredictorError::MissingDesignRow(7)));

        let err: PredictorError = DatasetError::Feature(FeatureError::UnknownCategory {
            attribute: "Ziehtiefe".to_string(),
            value: "70".to_string(),
            known: "30, 50".to_string(),
        })
        .into();
        assert!(matches!(err, PredictorError::UnknownCategory { ref attribute, .. } if attribute == "Ziehtiefe"));

        let err: PredictorError = AutotuneError::Configuration("trials must be positive".to_string()).into();
        assert!(matches!(err, PredictorError::Configuration(_)));
    }

    #[test]
    fn test_not_ready_message() {
        let err = PredictorError::from(NotReady::ModelMissing);
        assert_eq!(err.to_string(), "Predictor not ready: no trained or loaded model");
    }
}
