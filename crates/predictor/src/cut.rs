//! Cut-Line Predictor
//!
//! One position attribute along the cut line, queried by sample count over
//! the observed position range.

use crate::comparison::Comparison;
use crate::error::PredictorError;
use crate::surrogate::Predictor;
use autotune::{AutotuneOutcome, SearchSpace};
use dataset::SplitConfig;
use doe_table::{DesignTable, DoeId, ObservationTable};
use feature_engine::{linspace, FeatureSchema, ProcessParameters};
use inference_engine::{Hyperparameters, MlpTrainer, ModelTrainer, TrainSettings, TrainingHistory};
use ndarray::{Array2, ArrayView1};
use serde::Serialize;
use std::path::Path;

/// Prediction along the cut line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutPrediction {
    /// Raw position of every sample
    pub positions: Vec<f64>,
    /// Denormalized outputs, `(samples, outputs)`
    pub outputs: Array2<f64>,
    pub output_names: Vec<String>,
}

impl CutPrediction {
    /// One output across all samples
    pub fn output(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.output_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.outputs.column(i))
    }
}

/// 1D predictor over the shared [`Predictor`] core
pub struct CutPredictor<T: ModelTrainer = MlpTrainer> {
    core: Predictor<T>,
}

impl CutPredictor<MlpTrainer> {
    pub fn new() -> Self {
        Self::with_trainer(MlpTrainer)
    }
}

impl Default for CutPredictor<MlpTrainer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ModelTrainer> CutPredictor<T> {
    pub fn with_trainer(trainer: T) -> Self {
        Self {
            core: Predictor::with_trainer(trainer, 1),
        }
    }

    /// Shared core, for accessors such as `dataset` or `registry`
    pub fn core(&self) -> &Predictor<T> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Predictor<T> {
        &mut self.core
    }

    pub fn is_data_loaded(&self) -> bool {
        self.core.is_data_loaded()
    }

    pub fn is_trained(&self) -> bool {
        self.core.is_trained()
    }

    pub fn load_data(
        &mut self,
        design: &DesignTable,
        observations: &ObservationTable,
        schema: FeatureSchema,
        split: SplitConfig,
    ) -> Result<(), PredictorError> {
        self.core.load_data(design, observations, schema, split)
    }

    pub fn train(
        &mut self,
        hyperparameters: &Hyperparameters,
        settings: &TrainSettings,
    ) -> Result<TrainingHistory, PredictorError> {
        self.core.train(hyperparameters, settings)
    }

    pub fn autotune(
        &mut self,
        save_path: &Path,
        trials: usize,
        max_epochs: usize,
        space: SearchSpace,
    ) -> Result<AutotuneOutcome, PredictorError> {
        self.core.autotune(save_path, trials, max_epochs, space)
    }

    pub fn compare(&self, doe_id: DoeId) -> Result<Comparison, PredictorError> {
        self.core.compare(doe_id)
    }

    pub fn save_config(&self, path: &Path) -> Result<(), PredictorError> {
        self.core.save_config(path)
    }

    pub fn load_config(&mut self, path: &Path) -> Result<(), PredictorError> {
        self.core.load_config(path)
    }

    pub fn save_model(&self, path: &Path) -> Result<(), PredictorError> {
        self.core.save_model(path)
    }

    pub fn load_model(&mut self, path: &Path) -> Result<(), PredictorError> {
        self.core.load_model(path)
    }

    /// Predict `samples` evenly spaced positions between the smallest and
    /// largest observed position
    pub fn predict(&self, params: &ProcessParameters, samples: usize) -> Result<CutPrediction, PredictorError> {
        let registry = &self.core.require_config()?.registry;
        let position = registry
            .positions()
            .first()
            .ok_or_else(|| PredictorError::Configuration("no position attribute registered".to_string()))?;

        let positions = linspace(position.stats.min, position.stats.max, samples);
        let grid = Array2::from_shape_vec((positions.len(), 1), positions.clone())
            .map_err(|e| PredictorError::Configuration(e.to_string()))?;
        let outputs = self.core.predict_samples(params, grid.view())?;

        Ok(CutPrediction {
            positions,
            outputs,
            output_names: registry.output_names().into_iter().map(String::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotReady;
    use dataset::SplitConfig;
    use doe_table::{DesignTable, ObservationTable};
    use feature_engine::{FeatureSchema, PositionAttribute};
    use inference_engine::{Hyperparameters, TrainSettings};

    fn loaded() -> CutPredictor {
        let design = DesignTable::new("doe_id", vec![1, 2])
            .unwrap()
            .with_column("Stempel_ID", vec!["A", "B"])
            .unwrap();
        let observations = ObservationTable::new("doe_id", vec![1, 1, 1, 2, 2, 2])
            .with_column("tp", vec![0.5, 1.0, 2.5, 0.5, 1.5, 2.5])
            .unwrap()
            .with_column("deviationc", vec![0.1, 0.2, 0.1, 0.3, 0.4, 0.3])
            .unwrap();
        let schema = FeatureSchema::new("doe_id")
            .categorical("Stempel_ID")
            .position(PositionAttribute::new("tp"))
            .output("deviationc");

        let mut predictor = CutPredictor::new();
        predictor
            .load_data(&design, &observations, schema, SplitConfig::random(0.0))
            .unwrap();
        predictor
    }

    #[test]
    fn test_predict_spans_observed_range() {
        let mut predictor = loaded();
        let params = ProcessParameters::new().set("Stempel_ID", "B");
        assert!(matches!(
            predictor.predict(&params, 5),
            Err(PredictorError::NotReady(NotReady::ModelMissing))
        ));

        let settings = TrainSettings {
            epochs: 2,
            ..Default::default()
        };
        predictor.train(&Hyperparameters::default(), &settings).unwrap();

        let prediction = predictor.predict(&params, 5).unwrap();
        assert_eq!(prediction.positions, vec![0.5, 1.0, 1.5, 2.0, 2.5]);
        assert_eq!(prediction.outputs.dim(), (5, 1));
        assert_eq!(prediction.output("deviationc").map(|c| c.len()), Some(5));
        assert!(prediction.output("thickness").is_none());
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut predictor = loaded();
        let settings = TrainSettings {
            epochs: 1,
            ..Default::default()
        };
        predictor.train(&Hyperparameters::default(), &settings).unwrap();

        let params = ProcessParameters::new().set("Stempel_ID", "C");
        assert!(matches!(
            predictor.predict(&params, 3),
            Err(PredictorError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_two_positions_rejected() {
        let design = DesignTable::new("doe_id", vec![1]).unwrap();
        let observations = ObservationTable::new("doe_id", vec![1, 1])
            .with_column("x", vec![0.0, 1.0])
            .unwrap()
            .with_column("y", vec![0.0, 1.0])
            .unwrap()
            .with_column("thickness", vec![1.0, 1.1])
            .unwrap();
        let schema = FeatureSchema::new("doe_id")
            .position(PositionAttribute::new("x"))
            .position(PositionAttribute::new("y"))
            .output("thickness");
        let mut predictor = CutPredictor::new();
        assert!(matches!(
            predictor.load_data(&design, &observations, schema, SplitConfig::default()),
            Err(PredictorError::Configuration(_))
        ));
    }
}
