//! Shared Predictor Core
//!
//! Owns the active configuration (schema, registry, split), the dataset built
//! from the last loaded tables and the trained model. The 1D and 2D
//! predictors differ only in how many position attributes they accept and
//! how they build their query positions.

use crate::comparison::Comparison;
use crate::error::{NotReady, PredictorError};
use crate::snapshot::PredictorConfig;
use autotune::{AutotuneOutcome, AutotuneSettings, Autotuner, RandomSearch, SearchDriver, SearchSpace};
use dataset::{Dataset, DatasetBuilder, SplitConfig};
use doe_table::{DesignTable, DoeId, ObservationTable};
use feature_engine::{AttributeRegistry, FeatureEncoder, FeatureSchema, OutputScaler, ProcessParameters};
use inference_engine::{
    Hyperparameters, MlpTrainer, ModelTrainer, Regressor, TrainSettings, TrainingData, TrainingHistory,
};
use ndarray::{Array2, ArrayView2, Axis};
use std::path::Path;
use tracing::{debug, info};

/// Rows per model call at inference time
pub const PREDICT_BATCH_SIZE: usize = 1024;

/// Surrogate predictor over a fixed number of position attributes
pub struct Predictor<T: ModelTrainer = MlpTrainer> {
    trainer: T,
    positions: usize,
    config: Option<PredictorConfig>,
    dataset: Option<Dataset>,
    model: Option<T::Model>,
}

impl<T: ModelTrainer> Predictor<T> {
    /// Untrained predictor accepting exactly `positions` position attributes
    pub fn with_trainer(trainer: T, positions: usize) -> Self {
        Self {
            trainer,
            positions,
            config: None,
            dataset: None,
            model: None,
        }
    }

    /// Number of position attributes this predictor accepts
    pub fn position_count(&self) -> usize {
        self.positions
    }

    pub fn config(&self) -> Option<&PredictorConfig> {
        self.config.as_ref()
    }

    pub fn registry(&self) -> Option<&AttributeRegistry> {
        self.config.as_ref().map(|c| &c.registry)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn model(&self) -> Option<&T::Model> {
        self.model.as_ref()
    }

    pub fn is_data_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub(crate) fn require_config(&self) -> Result<&PredictorConfig, PredictorError> {
        self.config.as_ref().ok_or(NotReady::DataNotLoaded.into())
    }

    fn require_dataset(&self) -> Result<&Dataset, PredictorError> {
        self.dataset.as_ref().ok_or(NotReady::DataNotLoaded.into())
    }

    fn require_model(&self) -> Result<&T::Model, PredictorError> {
        self.model.as_ref().ok_or(NotReady::ModelMissing.into())
    }

    fn check_arity(&self, schema: &FeatureSchema) -> Result<(), PredictorError> {
        schema.require_positions(self.positions)?;
        Ok(())
    }

    /// Build registry and dataset from the tables.
    ///
    /// Replaces the active configuration and drops any model trained for
    /// the previous one. On error the predictor is left untouched.
    pub fn load_data(
        &mut self,
        design: &DesignTable,
        observations: &ObservationTable,
        schema: FeatureSchema,
        split: SplitConfig,
    ) -> Result<(), PredictorError> {
        schema.validate()?;
        self.check_arity(&schema)?;

        let registry = AttributeRegistry::build(&schema, design, observations)?;
        let dataset = DatasetBuilder::new(&registry).build(design, observations, &split)?;

        info!(
            "Data loaded: {} experiments, {} rows, {} features -> {} outputs",
            dataset.experiments().len(),
            dataset.len(),
            registry.feature_width(),
            registry.output_width()
        );
        metrics::gauge!("predictor_feature_width").set(registry.feature_width() as f64);

        self.config = Some(PredictorConfig::new(schema, registry, split));
        self.dataset = Some(dataset);
        self.model = None;
        Ok(())
    }

    /// Train one model on the current split and keep it
    pub fn train(
        &mut self,
        hyperparameters: &Hyperparameters,
        settings: &TrainSettings,
    ) -> Result<TrainingHistory, PredictorError> {
        let dataset = self.require_dataset()?;
        let (train_x, train_y) = (dataset.train_x(), dataset.train_y());
        let (val_x, val_y) = (dataset.validation_x(), dataset.validation_y());
        let data = TrainingData::new(train_x.view(), train_y.view()).with_validation(val_x.view(), val_y.view());

        let (model, history) = self.trainer.train(data, hyperparameters, settings)?;
        metrics::counter!("predictor_models_trained_total").increment(1);
        info!(
            "Model trained: score {:.6} after {} epochs",
            history.score(),
            history.epochs_run()
        );

        self.model = Some(model);
        Ok(history)
    }

    /// Random search over `space`; the best model is saved to `save_path` and kept
    pub fn autotune(
        &mut self,
        save_path: &Path,
        trials: usize,
        max_epochs: usize,
        space: SearchSpace,
    ) -> Result<AutotuneOutcome, PredictorError> {
        let seed = self.require_config()?.split.seed;
        let settings = AutotuneSettings {
            trials,
            train: TrainSettings {
                epochs: max_epochs,
                seed,
                ..Default::default()
            },
        };
        let mut driver = RandomSearch::new(seed);
        self.autotune_with(&mut driver, save_path, &settings, space)
    }

    /// Autotune with a caller-supplied search driver
    pub fn autotune_with<D: SearchDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        save_path: &Path,
        settings: &AutotuneSettings,
        space: SearchSpace,
    ) -> Result<AutotuneOutcome, PredictorError> {
        let dataset = self.require_dataset()?;
        let tuner = Autotuner::new(space, settings.clone());
        let (outcome, model) = tuner.run(&self.trainer, driver, dataset, save_path)?;
        metrics::counter!("predictor_models_trained_total").increment(outcome.trials.len() as u64);

        self.model = Some(model);
        Ok(outcome)
    }

    /// Denormalized prediction for one parameter set over `(N, positions)` raw samples
    pub fn predict_samples(
        &self,
        params: &ProcessParameters,
        samples: ArrayView2<f64>,
    ) -> Result<Array2<f64>, PredictorError> {
        let config = self.require_config()?;
        let model = self.require_model()?;

        let x = FeatureEncoder::new(&config.registry).encode_batch(params, samples)?;
        let y = model.predict(x.view(), PREDICT_BATCH_SIZE)?;
        let outputs = OutputScaler::new(&config.registry).denormalize_rows(y.view())?;

        debug!("Predicted {} samples", outputs.nrows());
        Ok(outputs)
    }

    /// Prediction against the measured rows of one loaded experiment
    pub fn compare(&self, doe_id: DoeId) -> Result<Comparison, PredictorError> {
        let dataset = self.require_dataset()?;
        let config = self.require_config()?;
        let model = self.require_model()?;
        if !dataset.contains(doe_id) {
            return Err(PredictorError::UnknownExperiment(doe_id));
        }

        let rows = dataset.rows_for(doe_id);
        let x = dataset.features().select(Axis(0), &rows);
        let y = model.predict(x.view(), PREDICT_BATCH_SIZE)?;
        let prediction = OutputScaler::new(&config.registry).denormalize_rows(y.view())?;

        let registry = &config.registry;
        Ok(Comparison::new(
            doe_id,
            registry.position_names().into_iter().map(String::from).collect(),
            registry.output_names().into_iter().map(String::from).collect(),
            dataset.raw_positions().select(Axis(0), &rows),
            dataset.raw_outputs().select(Axis(0), &rows),
            prediction,
        ))
    }

    /// Persist schema, registry and split settings as JSON
    pub fn save_config(&self, path: &Path) -> Result<(), PredictorError> {
        self.require_config()?.save(path)
    }

    /// Restore a configuration; the dataset and any model are dropped
    pub fn load_config(&mut self, path: &Path) -> Result<(), PredictorError> {
        let config = PredictorConfig::load(path)?;
        self.check_arity(&config.schema)?;

        self.config = Some(config);
        self.dataset = None;
        self.model = None;
        Ok(())
    }

    pub fn save_model(&self, path: &Path) -> Result<(), PredictorError> {
        self.require_model()?.save(path)?;
        Ok(())
    }

    /// Load a model whose widths match the active configuration
    pub fn load_model(&mut self, path: &Path) -> Result<(), PredictorError> {
        let registry = &self.require_config()?.registry;
        let (features, outputs) = (registry.feature_width(), registry.output_width());

        let model = self.trainer.load(path)?;
        if model.input_width() != features || model.output_width() != outputs {
            return Err(PredictorError::Configuration(format!(
                "model maps {} features to {} outputs, configuration needs {} -> {}",
                model.input_width(),
                model.output_width(),
                features,
                outputs
            )));
        }

        info!("Model loaded from {}", path.display());
        self.model = Some(model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::PositionAttribute;

    fn tables() -> (DesignTable, ObservationTable) {
        let design = DesignTable::new("doe_id", vec![1, 2, 3])
            .unwrap()
            .with_column("Blechdicke", vec![1.0, 1.5, 2.0])
            .unwrap();
        let observations = ObservationTable::new("doe_id", vec![1, 1, 2, 2, 3, 3])
            .with_column("tp", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0])
            .unwrap()
            .with_column("radius", vec![1.0, 2.0, 1.5, 2.5, 2.0, 3.0])
            .unwrap();
        (design, observations)
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new("doe_id")
            .continuous("Blechdicke")
            .position(PositionAttribute::new("tp"))
            .output("radius")
    }

    fn quick() -> (Hyperparameters, TrainSettings) {
        (
            Hyperparameters {
                layers: 1,
                neurons: 8,
                dropout: 0.0,
                learning_rate: 1e-2,
            },
            TrainSettings {
                epochs: 3,
                batch_size: 4,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_not_ready_states() {
        let mut predictor = Predictor::with_trainer(MlpTrainer, 1);
        let params = ProcessParameters::new().set("Blechdicke", 1.2);
        let samples = Array2::zeros((2, 1));

        assert!(matches!(
            predictor.predict_samples(&params, samples.view()),
            Err(PredictorError::NotReady(NotReady::DataNotLoaded))
        ));
        assert!(matches!(
            predictor.compare(1),
            Err(PredictorError::NotReady(NotReady::DataNotLoaded))
        ));
        let (hp, settings) = quick();
        assert!(matches!(
            predictor.train(&hp, &settings),
            Err(PredictorError::NotReady(NotReady::DataNotLoaded))
        ));

        let (design, observations) = tables();
        predictor
            .load_data(&design, &observations, schema(), SplitConfig::random(0.0))
            .unwrap();
        assert!(matches!(
            predictor.predict_samples(&params, samples.view()),
            Err(PredictorError::NotReady(NotReady::ModelMissing))
        ));
        assert!(!predictor.is_trained());

        predictor.train(&hp, &settings).unwrap();
        assert_eq!(predictor.predict_samples(&params, samples.view()).unwrap().dim(), (2, 1));
    }

    #[test]
    fn test_wrong_arity_leaves_state_untouched() {
        let (design, observations) = tables();
        let mut predictor = Predictor::with_trainer(MlpTrainer, 2);
        let err = predictor
            .load_data(&design, &observations, schema(), SplitConfig::default())
            .unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
        assert!(predictor.config().is_none());
        assert!(!predictor.is_data_loaded());
    }

    #[test]
    fn test_reload_drops_model() {
        let (design, observations) = tables();
        let mut predictor = Predictor::with_trainer(MlpTrainer, 1);
        predictor
            .load_data(&design, &observations, schema(), SplitConfig::random(0.0))
            .unwrap();
        let (hp, settings) = quick();
        predictor.train(&hp, &settings).unwrap();
        assert!(predictor.is_trained());

        predictor
            .load_data(&design, &observations, schema(), SplitConfig::random(0.0))
            .unwrap();
        assert!(!predictor.is_trained());
    }

    #[test]
    fn test_compare_unknown_experiment() {
        let (design, observations) = tables();
        let mut predictor = Predictor::with_trainer(MlpTrainer, 1);
        predictor
            .load_data(&design, &observations, schema(), SplitConfig::random(0.0))
            .unwrap();
        let (hp, settings) = quick();
        predictor.train(&hp, &settings).unwrap();

        assert!(matches!(predictor.compare(9), Err(PredictorError::UnknownExperiment(9))));
        let comparison = predictor.compare(2).unwrap();
        assert_eq!(comparison.len(), 2);
        assert_eq!(comparison.truth.column(0).to_vec(), vec![1.5, 2.5]);
        assert_eq!(comparison.positions.column(0).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_model_width_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let (design, observations) = tables();

        let mut predictor = Predictor::with_trainer(MlpTrainer, 1);
        predictor
            .load_data(&design, &observations, schema(), SplitConfig::random(0.0))
            .unwrap();
        let (hp, settings) = quick();
        predictor.train(&hp, &settings).unwrap();
        predictor.save_model(&path).unwrap();

        let angular = FeatureSchema::new("doe_id")
            .continuous("Blechdicke")
            .position(PositionAttribute::new("tp").angular())
            .output("radius");
        predictor
            .load_data(&design, &observations, angular, SplitConfig::random(0.0))
            .unwrap();
        assert!(matches!(
            predictor.load_model(&path),
            Err(PredictorError::Configuration(_))
        ));
        assert!(!predictor.is_trained());
    }
}
