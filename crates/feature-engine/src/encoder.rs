//! Feature Vector Assembly

use crate::error::FeatureError;
use crate::registry::{AttributeRegistry, PositionEntry, ProcessEncoding};
use doe_table::{AttrValue, DesignTable, DoeId};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Process parameter values of one query, keyed by attribute name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessParameters {
    values: BTreeMap<String, AttrValue>,
}

impl ProcessParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn set(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters of one design table experiment, restricted to `names`
    pub fn from_design<'n>(
        design: &DesignTable,
        id: DoeId,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Option<Self> {
        let mut params = Self::new();
        for name in names {
            params.insert(name, design.value(id, name)?.clone());
        }
        Some(params)
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for ProcessParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// One-hot code of `value` over the known `categories`
pub fn one_hot(attribute: &str, value: &AttrValue, categories: &[AttrValue]) -> Result<Vec<f64>, FeatureError> {
    let position = categories
        .iter()
        .position(|c| c == value)
        .ok_or_else(|| FeatureError::UnknownCategory {
            attribute: attribute.to_string(),
            value: value.to_string(),
            known: categories
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })?;

    let mut code = vec![0.0; categories.len()];
    code[position] = 1.0;
    Ok(code)
}

/// Encodes process parameters and positions with one registry's constants
pub struct FeatureEncoder<'a> {
    registry: &'a AttributeRegistry,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(registry: &'a AttributeRegistry) -> Self {
        Self { registry }
    }

    /// Width of every encoded feature vector
    pub fn width(&self) -> usize {
        self.registry.feature_width()
    }

    /// Number of position attributes expected per sample
    pub fn position_count(&self) -> usize {
        self.registry.positions().len()
    }

    /// Encode the process parameter prefix of a feature vector
    pub fn encode_process(&self, params: &ProcessParameters) -> Result<Vec<f64>, FeatureError> {
        self.encode_process_with(|name| params.get(name))
    }

    /// Encode the prefix from any name lookup
    pub(crate) fn encode_process_with<'v, F>(&self, lookup: F) -> Result<Vec<f64>, FeatureError>
    where
        F: Fn(&str) -> Option<&'v AttrValue>,
    {
        let mut features = Vec::with_capacity(self.width());

        for entry in self.registry.process() {
            let value = lookup(&entry.name).ok_or_else(|| {
                FeatureError::Configuration(format!("missing value for process parameter '{}'", entry.name))
            })?;

            match &entry.encoding {
                ProcessEncoding::Categorical(categories) => {
                    features.extend(one_hot(&entry.name, value, categories)?);
                }
                ProcessEncoding::Continuous(stats) => {
                    let v = value.as_number().ok_or_else(|| {
                        FeatureError::Configuration(format!(
                            "continuous parameter '{}' got non-numeric value '{}'",
                            entry.name, value
                        ))
                    })?;
                    features.push(stats.standardize(v));
                }
            }
        }

        Ok(features)
    }

    /// Encode the prefix for a design table experiment
    pub fn encode_experiment(&self, design: &DesignTable, id: DoeId) -> Result<Vec<f64>, FeatureError> {
        if !design.contains(id) {
            return Err(FeatureError::MissingDesignRow(id));
        }
        self.encode_process_with(|name| design.value(id, name))
    }

    /// Append the encoded positions of one sample
    pub fn push_positions(&self, positions: &[f64], features: &mut Vec<f64>) -> Result<(), FeatureError> {
        let entries = self.registry.positions();
        if positions.len() != entries.len() {
            return Err(FeatureError::Configuration(format!(
                "expected {} position value(s), got {}",
                entries.len(),
                positions.len()
            )));
        }

        for (entry, &value) in entries.iter().zip(positions) {
            encode_position(entry, value, features);
        }
        Ok(())
    }

    /// Encode one full feature vector
    pub fn encode_row(&self, params: &ProcessParameters, positions: &[f64]) -> Result<Vec<f64>, FeatureError> {
        let mut features = self.encode_process(params)?;
        self.push_positions(positions, &mut features)?;
        Ok(features)
    }

    /// Encode one parameter set broadcast over `(N, positions)` samples
    pub fn encode_batch(&self, params: &ProcessParameters, samples: ArrayView2<f64>) -> Result<Array2<f64>, FeatureError> {
        let prefix = self.encode_process(params)?;
        self.encode_samples(&prefix, samples)
    }

    /// Append every sample's positions to an already encoded prefix
    pub fn encode_samples(&self, prefix: &[f64], samples: ArrayView2<f64>) -> Result<Array2<f64>, FeatureError> {
        if samples.ncols() != self.position_count() {
            return Err(FeatureError::Configuration(format!(
                "positions must have shape (N, {}), got (N, {})",
                self.position_count(),
                samples.ncols()
            )));
        }

        let width = self.width();
        let mut matrix = Array2::zeros((samples.nrows(), width));
        let mut row = Vec::with_capacity(width);
        for (i, sample) in samples.rows().into_iter().enumerate() {
            row.clear();
            row.extend_from_slice(prefix);
            for (entry, &value) in self.registry.positions().iter().zip(sample.iter()) {
                encode_position(entry, value, &mut row);
            }
            debug_assert_eq!(row.len(), width);
            matrix.row_mut(i).iter_mut().zip(&row).for_each(|(dst, &src)| *dst = src);
        }

        debug!("Encoded {} samples ({} features)", samples.nrows(), width);
        Ok(matrix)
    }
}

fn encode_position(entry: &PositionEntry, value: f64, features: &mut Vec<f64>) {
    if entry.angular {
        features.push(value.cos());
        features.push(value.sin());
    } else {
        features.push(entry.scaler.scale(&entry.stats, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FeatureSchema, PositionAttribute, PositionScaler};
    use doe_table::ObservationTable;
    use ndarray::array;
    use std::f64::consts::PI;

    fn tables() -> (DesignTable, ObservationTable) {
        let design = DesignTable::new("doe_id", vec![1, 2, 3])
            .unwrap()
            .with_column("Blechdicke", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_column("Ziehspalt", vec![1.6, 2.5, 2.0])
            .unwrap()
            .with_column("Stempel_ID", vec!["P1", "P2", "P1"])
            .unwrap();
        let observations = ObservationTable::new("doe_id", vec![1, 1, 2, 2, 3, 3])
            .with_column("c_phi", vec![0.0, 2.0 * PI, 0.0, PI, PI, 2.0 * PI])
            .unwrap()
            .with_column("xp", vec![0.0, 10.0, 0.0, 10.0, 5.0, 5.0])
            .unwrap()
            .with_column("yp", vec![-1.0, 1.0, -1.0, 1.0, 0.0, 0.5])
            .unwrap()
            .with_column("c_rho", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        (design, observations)
    }

    fn cut_schema(angular: bool) -> FeatureSchema {
        let position = PositionAttribute::new("c_phi");
        FeatureSchema::new("doe_id")
            .continuous("Blechdicke")
            .categorical("Ziehspalt")
            .categorical("Stempel_ID")
            .position(if angular { position.angular() } else { position })
            .output("c_rho")
    }

    fn build(schema: &FeatureSchema) -> AttributeRegistry {
        let (design, observations) = tables();
        AttributeRegistry::build(schema, &design, &observations).unwrap()
    }

    fn query() -> ProcessParameters {
        ProcessParameters::new()
            .set("Blechdicke", 2.0)
            .set("Ziehspalt", 2.5)
            .set("Stempel_ID", "P1")
    }

    #[test]
    fn test_one_hot_exclusive() {
        let categories = vec![AttrValue::from(1.6), AttrValue::from(2.5), AttrValue::from(2.0)];
        for (i, value) in categories.iter().enumerate() {
            let code = one_hot("Ziehspalt", value, &categories).unwrap();
            assert_eq!(code.len(), 3);
            assert_eq!(code.iter().filter(|&&c| c == 1.0).count(), 1);
            assert_eq!(code.iter().filter(|&&c| c == 0.0).count(), 2);
            assert_eq!(code[i], 1.0);
        }
    }

    #[test]
    fn test_unknown_category_fails() {
        let registry = build(&cut_schema(false));
        let encoder = FeatureEncoder::new(&registry);
        let params = query().set("Stempel_ID", "P9");
        let err = encoder.encode_row(&params, &[0.0]).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::UnknownCategory { ref attribute, ref value, .. }
                if attribute == "Stempel_ID" && value == "P9"
        ));
    }

    #[test]
    fn test_missing_parameter_fails() {
        let registry = build(&cut_schema(false));
        let encoder = FeatureEncoder::new(&registry);
        let params = ProcessParameters::new().set("Blechdicke", 2.0);
        let err = encoder.encode_process(&params).unwrap_err();
        assert!(err.to_string().contains("Ziehspalt"));
    }

    #[test]
    fn test_column_order() {
        let registry = build(&cut_schema(false));
        let encoder = FeatureEncoder::new(&registry);
        let row = encoder.encode_row(&query(), &[PI]).unwrap();

        // Blechdicke | Ziehspalt (1.6, 2.5, 2.0) | Stempel_ID (P1, P2) | c_phi
        assert_eq!(row.len(), 1 + 3 + 2 + 1);
        let stats = registry.stats("Blechdicke").unwrap();
        assert!((row[0] - stats.standardize(2.0)).abs() < 1e-12);
        assert_eq!(&row[1..4], &[0.0, 1.0, 0.0]);
        assert_eq!(&row[4..6], &[1.0, 0.0]);
        let phi = registry.stats("c_phi").unwrap();
        assert!((row[6] - phi.standardize(PI)).abs() < 1e-12);
    }

    #[test]
    fn test_width_invariant() {
        for angular in [false, true] {
            let registry = build(&cut_schema(angular));
            let encoder = FeatureEncoder::new(&registry);
            let expected = 1 + 3 + 2 + if angular { 2 } else { 1 };
            assert_eq!(encoder.width(), expected);

            let samples = array![[0.0], [1.0], [2.5], [6.0]];
            let batch = encoder.encode_batch(&query(), samples.view()).unwrap();
            assert_eq!(batch.dim(), (4, expected));
        }
    }

    #[test]
    fn test_angular_periodicity() {
        let registry = build(&cut_schema(true));
        let encoder = FeatureEncoder::new(&registry);
        let start = encoder.encode_row(&query(), &[0.0]).unwrap();
        let end = encoder.encode_row(&query(), &[2.0 * PI]).unwrap();

        let offset = registry.process_width();
        for row in [&start, &end] {
            assert!((row[offset] - 1.0).abs() < 1e-12);
            assert!(row[offset + 1].abs() < 1e-12);
        }

        // The scaled-scalar encoding separates the same two endpoints
        let scalar = build(&cut_schema(false));
        let scalar_encoder = FeatureEncoder::new(&scalar);
        let a = scalar_encoder.encode_row(&query(), &[0.0]).unwrap();
        let b = scalar_encoder.encode_row(&query(), &[2.0 * PI]).unwrap();
        assert!((a[6] - b[6]).abs() > 1.0);
    }

    #[test]
    fn test_projection_minmax() {
        let schema = FeatureSchema::new("doe_id")
            .continuous("Blechdicke")
            .position(PositionAttribute::new("xp"))
            .position(PositionAttribute::new("yp"))
            .output("c_rho")
            .with_position_scaler(PositionScaler::MinMax);
        let registry = build(&schema);
        let encoder = FeatureEncoder::new(&registry);

        let samples = array![[0.0, -1.0], [10.0, 1.0], [5.0, 0.0]];
        let params = ProcessParameters::new().set("Blechdicke", 1.0);
        let batch = encoder.encode_batch(&params, samples.view()).unwrap();
        assert_eq!(batch.row(0).to_vec()[1..], [0.0, 0.0]);
        assert_eq!(batch.row(1).to_vec()[1..], [1.0, 1.0]);
        assert_eq!(batch.row(2).to_vec()[1..], [0.5, 0.5]);
    }

    #[test]
    fn test_sample_width_checked() {
        let registry = build(&cut_schema(false));
        let encoder = FeatureEncoder::new(&registry);
        let samples = array![[0.0, 1.0]];
        assert!(encoder.encode_batch(&query(), samples.view()).is_err());
        assert!(encoder.encode_row(&query(), &[]).is_err());
    }

    #[test]
    fn test_encode_experiment_matches_query() {
        let (design, _) = tables();
        let registry = build(&cut_schema(false));
        let encoder = FeatureEncoder::new(&registry);
        let from_design = encoder.encode_experiment(&design, 2).unwrap();
        let params = ProcessParameters::from_design(&design, 2, ["Blechdicke", "Ziehspalt", "Stempel_ID"]).unwrap();
        assert_eq!(from_design, encoder.encode_process(&params).unwrap());
        assert_eq!(encoder.encode_experiment(&design, 42).unwrap_err(), FeatureError::MissingDesignRow(42));
    }
}
