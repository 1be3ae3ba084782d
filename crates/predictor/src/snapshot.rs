//! Persisted Configuration

use crate::error::PredictorError;
use chrono::{DateTime, Utc};
use dataset::SplitConfig;
use feature_engine::{AttributeRegistry, FeatureSchema};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Everything needed to rebuild the encoder and scaler without the tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub schema: FeatureSchema,
    pub registry: AttributeRegistry,
    pub split: SplitConfig,
    pub created_at: DateTime<Utc>,
}

impl PredictorConfig {
    pub fn new(schema: FeatureSchema, registry: AttributeRegistry, split: SplitConfig) -> Self {
        Self {
            schema,
            registry,
            split,
            created_at: Utc::now(),
        }
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), PredictorError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| PredictorError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PredictorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| PredictorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Read a file written by [`PredictorConfig::save`]
    pub fn load(path: &Path) -> Result<Self, PredictorError> {
        let json = fs::read_to_string(path).map_err(|source| PredictorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| PredictorError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
        config.schema.validate()?;

        let registered = config.registry.position_names();
        let declared: Vec<&str> = config.schema.positions.iter().map(|p| p.name.as_str()).collect();
        if registered != declared {
            return Err(PredictorError::Configuration(format!(
                "registry positions {:?} do not match the schema {:?}",
                registered, declared
            )));
        }

        info!(
            "Configuration loaded from {} (created {})",
            path.display(),
            config.created_at.to_rfc3339()
        );
        Ok(config)
    }
}
