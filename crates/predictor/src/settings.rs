//! Settings File
//!
//! Collects everything a training run needs in one file, read with the
//! `config` crate. Values can be overridden from the environment with the
//! `SURROGATE` prefix and `__` as the nesting separator, e.g.
//! `SURROGATE__TRAINING__EPOCHS=100`.

use crate::error::PredictorError;
use autotune::{AutotuneSettings, SearchSpace};
use dataset::SplitConfig;
use feature_engine::FeatureSchema;
use inference_engine::{Hyperparameters, TrainSettings};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SURROGATE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub schema: FeatureSchema,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
    #[serde(default)]
    pub training: TrainSettings,
    #[serde(default)]
    pub autotune: AutotuneSettings,
    #[serde(default)]
    pub search_space: SearchSpace,
}

impl Settings {
    /// Read a TOML or JSON file (format from the extension) plus environment overrides
    pub fn load(path: &Path) -> Result<Self, PredictorError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Check every section eagerly
    pub fn validate(&self) -> Result<(), PredictorError> {
        self.schema.validate()?;
        self.split.validate()?;
        self.hyperparameters.validate()?;
        self.search_space.validate()?;
        Ok(())
    }
}
