//! Sheet-Metal Surrogate Predictors
//!
//! Learned replacement for forming simulations: given the process
//! parameters of an experiment, predict cut-line quantities along one
//! position axis ([`CutPredictor`]) or surface quantities over two
//! projected coordinates ([`ProjectionPredictor`]).
//!
//! Both wrap the same [`Predictor`] core, so data loading, training,
//! autotuning, comparison and persistence behave identically.

mod comparison;
mod cut;
mod error;
mod projection;
mod snapshot;
mod surrogate;

pub mod settings;

pub use comparison::Comparison;
pub use cut::{CutPrediction, CutPredictor};
pub use error::{NotReady, PredictorError};
pub use projection::{PositionQuery, ProjectionPrediction, ProjectionPredictor};
pub use settings::Settings;
pub use snapshot::PredictorConfig;
pub use surrogate::{Predictor, PREDICT_BATCH_SIZE};

pub use autotune::{AutotuneOutcome, AutotuneSettings, RandomSearch, SearchDriver, SearchSpace};
pub use dataset::{SplitConfig, ValidationMethod};
pub use doe_table::{AttrValue, DesignTable, DoeId, ObservationTable};
pub use feature_engine::{FeatureSchema, PositionAttribute, PositionScaler, ProcessParameters};
pub use inference_engine::{Hyperparameters, MlpTrainer, TrainSettings};

use tracing_subscriber::EnvFilter;

/// Install a formatted tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this
/// again once a subscriber is installed has no effect.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
