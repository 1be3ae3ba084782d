//! Attribute Registry
//!
//! Per-attribute statistics and category sets, computed once from the
//! experiment tables and never mutated afterwards. Every encoder and scaler
//! derived from one registry shares the exact same normalization constants.

use crate::error::FeatureError;
use crate::schema::{FeatureSchema, ParameterKind, PositionScaler};
use crate::statistics::ColumnStats;
use doe_table::{AttrValue, DesignTable, ObservationTable, TableValidator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Encoding data for one process parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ProcessEncoding {
    /// Standardization constants
    Continuous(ColumnStats),
    /// Known values in one-hot order
    Categorical(Vec<AttrValue>),
}

/// Registry entry of a process parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub name: String,
    pub encoding: ProcessEncoding,
}

impl ProcessEntry {
    /// Feature columns taken by this parameter
    pub fn width(&self) -> usize {
        match &self.encoding {
            ProcessEncoding::Continuous(_) => 1,
            ProcessEncoding::Categorical(values) => values.len(),
        }
    }
}

/// Registry entry of a position attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub name: String,
    pub stats: ColumnStats,
    pub scaler: PositionScaler,
    pub angular: bool,
}

impl PositionEntry {
    /// Feature columns taken by this position
    pub fn width(&self) -> usize {
        if self.angular {
            2
        } else {
            1
        }
    }
}

/// Registry entry of an output attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub name: String,
    pub stats: ColumnStats,
}

/// Immutable normalization contract between training and inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRegistry {
    index: String,
    process: Vec<ProcessEntry>,
    positions: Vec<PositionEntry>,
    outputs: Vec<OutputEntry>,
}

impl AttributeRegistry {
    /// Compute the registry for a schema over a table pair.
    ///
    /// Process parameter statistics are taken over the expanded rows (each
    /// observation row weighs its experiment's value), position and output
    /// statistics over the observation table. Category order is the order
    /// of first appearance in the design table.
    pub fn build(
        schema: &FeatureSchema,
        design: &DesignTable,
        observations: &ObservationTable,
    ) -> Result<Self, FeatureError> {
        schema.validate()?;

        if design.index_name() != schema.index || observations.index_name() != schema.index {
            return Err(FeatureError::Configuration(format!(
                "experiment id column mismatch: schema '{}', design '{}', observations '{}'",
                schema.index,
                design.index_name(),
                observations.index_name()
            )));
        }
        if observations.is_empty() {
            return Err(FeatureError::Configuration(
                "the observation table is empty".to_string(),
            ));
        }

        let validator = TableValidator::new(design, observations);
        validator.require_design_columns(schema.process_parameters.iter().map(|p| p.name.as_str()))?;
        validator.require_observation_columns(
            schema
                .positions
                .iter()
                .map(|p| p.name.as_str())
                .chain(schema.outputs.iter().map(String::as_str)),
        )?;
        validator.validate_join()?;

        // Design row of every observation row
        let rows: Vec<usize> = observations
            .ids()
            .iter()
            .map(|&id| design.row_of(id).ok_or(FeatureError::MissingDesignRow(id)))
            .collect::<Result<_, _>>()?;

        let mut process = Vec::with_capacity(schema.process_parameters.len());
        for param in &schema.process_parameters {
            let column = design
                .column(&param.name)
                .ok_or_else(|| missing_column(&param.name))?;

            let encoding = match param.kind {
                ParameterKind::Categorical => {
                    let mut values: Vec<AttrValue> = Vec::new();
                    for v in column {
                        if !values.contains(v) {
                            values.push(v.clone());
                        }
                    }
                    debug!("Categorical '{}': {} values", param.name, values.len());
                    ProcessEncoding::Categorical(values)
                }
                ParameterKind::Continuous => {
                    let expanded: Vec<f64> = rows
                        .iter()
                        .map(|&row| {
                            column[row].as_number().ok_or_else(|| {
                                FeatureError::Configuration(format!(
                                    "continuous attribute '{}' holds non-numeric value '{}'",
                                    param.name, column[row]
                                ))
                            })
                        })
                        .collect::<Result<_, _>>()?;
                    ProcessEncoding::Continuous(continuous_stats(&param.name, &expanded)?)
                }
            };

            process.push(ProcessEntry {
                name: param.name.clone(),
                encoding,
            });
        }

        let mut positions = Vec::with_capacity(schema.positions.len());
        for attr in &schema.positions {
            let column = observations
                .column(&attr.name)
                .ok_or_else(|| missing_column(&attr.name))?;
            positions.push(PositionEntry {
                name: attr.name.clone(),
                stats: continuous_stats(&attr.name, column)?,
                scaler: attr.scaler,
                angular: attr.angular,
            });
        }

        let mut outputs = Vec::with_capacity(schema.outputs.len());
        for name in &schema.outputs {
            let column = observations
                .column(name)
                .ok_or_else(|| missing_column(name))?;
            outputs.push(OutputEntry {
                name: name.clone(),
                stats: continuous_stats(name, column)?,
            });
        }

        let registry = Self {
            index: schema.index.clone(),
            process,
            positions,
            outputs,
        };

        info!(
            "Attribute registry built: {} process parameters, {} positions, {} outputs, feature width {}",
            registry.process.len(),
            registry.positions.len(),
            registry.outputs.len(),
            registry.feature_width()
        );

        Ok(registry)
    }

    /// Experiment id column name
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Process parameter entries in feature order
    pub fn process(&self) -> &[ProcessEntry] {
        &self.process
    }

    /// Position entries in feature order
    pub fn positions(&self) -> &[PositionEntry] {
        &self.positions
    }

    /// Output entries in target order
    pub fn outputs(&self) -> &[OutputEntry] {
        &self.outputs
    }

    pub fn position_names(&self) -> Vec<&str> {
        self.positions.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.name.as_str()).collect()
    }

    /// Statistics of any continuous attribute by name
    pub fn stats(&self, name: &str) -> Option<&ColumnStats> {
        self.process
            .iter()
            .find_map(|p| match &p.encoding {
                ProcessEncoding::Continuous(stats) if p.name == name => Some(stats),
                _ => None,
            })
            .or_else(|| self.positions.iter().find(|p| p.name == name).map(|p| &p.stats))
            .or_else(|| self.outputs.iter().find(|o| o.name == name).map(|o| &o.stats))
    }

    /// Known values of a categorical attribute, in one-hot order
    pub fn categories(&self, name: &str) -> Option<&[AttrValue]> {
        self.process.iter().find_map(|p| match &p.encoding {
            ProcessEncoding::Categorical(values) if p.name == name => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Width of the process parameter part of a feature vector
    pub fn process_width(&self) -> usize {
        self.process.iter().map(ProcessEntry::width).sum()
    }

    /// Width of every feature vector
    pub fn feature_width(&self) -> usize {
        self.process_width() + self.positions.iter().map(PositionEntry::width).sum::<usize>()
    }

    /// Width of every target vector
    pub fn output_width(&self) -> usize {
        self.outputs.len()
    }
}

fn continuous_stats(name: &str, values: &[f64]) -> Result<ColumnStats, FeatureError> {
    let stats = ColumnStats::compute(values);
    if stats.is_constant() {
        return Err(FeatureError::Configuration(format!(
            "continuous attribute '{}' has zero variance",
            name
        )));
    }
    debug!(
        "'{}': mean={:.4}, std={:.4}, min={:.4}, max={:.4}",
        name, stats.mean, stats.std, stats.min, stats.max
    );
    Ok(stats)
}

fn missing_column(name: &str) -> FeatureError {
    FeatureError::Configuration(format!("missing column '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PositionAttribute;

    fn tables() -> (DesignTable, ObservationTable) {
        let design = DesignTable::new("doe_id", vec![1, 2, 3])
            .unwrap()
            .with_column("Blechdicke", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_column("Stempel_ID", vec!["B", "A", "B"])
            .unwrap();
        let observations = ObservationTable::new("doe_id", vec![1, 1, 2, 3])
            .with_column("c_phi", vec![0.0, 1.0, 0.5, 1.0])
            .unwrap()
            .with_column("c_rho", vec![10.0, 12.0, 11.0, 13.0])
            .unwrap();
        (design, observations)
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new("doe_id")
            .continuous("Blechdicke")
            .categorical("Stempel_ID")
            .position(PositionAttribute::new("c_phi"))
            .output("c_rho")
    }

    #[test]
    fn test_process_stats_over_expanded_rows() {
        let (design, observations) = tables();
        let registry = AttributeRegistry::build(&schema(), &design, &observations).unwrap();

        // Expanded Blechdicke column is [1, 1, 2, 3]
        let stats = registry.stats("Blechdicke").unwrap();
        assert!((stats.mean - 1.75).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
    }

    #[test]
    fn test_categories_in_first_appearance_order() {
        let (design, observations) = tables();
        let registry = AttributeRegistry::build(&schema(), &design, &observations).unwrap();
        assert_eq!(
            registry.categories("Stempel_ID").unwrap(),
            &[AttrValue::from("B"), AttrValue::from("A")]
        );
        assert!(registry.categories("Blechdicke").is_none());
    }

    #[test]
    fn test_widths() {
        let (design, observations) = tables();
        let registry = AttributeRegistry::build(&schema(), &design, &observations).unwrap();
        assert_eq!(registry.process_width(), 3);
        assert_eq!(registry.feature_width(), 4);
        assert_eq!(registry.output_width(), 1);
    }

    #[test]
    fn test_missing_attribute_is_configuration_error() {
        let (design, observations) = tables();
        let schema = schema().continuous("Rp0");
        let err = AttributeRegistry::build(&schema, &design, &observations).unwrap_err();
        assert!(matches!(err, FeatureError::Configuration(ref m) if m.contains("Rp0")));
    }

    #[test]
    fn test_zero_variance_rejected() {
        let (design, _) = tables();
        let observations = ObservationTable::new("doe_id", vec![1, 2])
            .with_column("c_phi", vec![0.0, 1.0])
            .unwrap()
            .with_column("c_rho", vec![4.0, 4.0])
            .unwrap();
        let err = AttributeRegistry::build(&schema(), &design, &observations).unwrap_err();
        assert!(err.to_string().contains("zero variance"));
    }

    #[test]
    fn test_text_in_continuous_column_rejected() {
        let (design, observations) = tables();
        let schema = FeatureSchema::new("doe_id")
            .continuous("Stempel_ID")
            .position(PositionAttribute::new("c_phi"))
            .output("c_rho");
        let err = AttributeRegistry::build(&schema, &design, &observations).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_missing_design_row() {
        let (design, _) = tables();
        let observations = ObservationTable::new("doe_id", vec![1, 9])
            .with_column("c_phi", vec![0.0, 1.0])
            .unwrap()
            .with_column("c_rho", vec![1.0, 2.0])
            .unwrap();
        let err = AttributeRegistry::build(&schema(), &design, &observations).unwrap_err();
        assert_eq!(err, FeatureError::MissingDesignRow(9));
    }

    #[test]
    fn test_index_mismatch() {
        let (design, _) = tables();
        let observations = ObservationTable::new("experiment", vec![1, 2])
            .with_column("c_phi", vec![0.0, 1.0])
            .unwrap()
            .with_column("c_rho", vec![1.0, 2.0])
            .unwrap();
        assert!(AttributeRegistry::build(&schema(), &design, &observations).is_err());
    }
}
