//! Feature Schema
//!
//! Declares which table columns feed the model and how each one is encoded.

use crate::error::FeatureError;
use doe_table::DEFAULT_INDEX;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a process parameter is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Standardized scalar
    #[default]
    Continuous,
    /// One-hot vector over the observed values
    Categorical,
}

/// Process parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameter {
    pub name: String,
    #[serde(default)]
    pub kind: ParameterKind,
}

impl ProcessParameter {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Continuous,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Categorical,
        }
    }
}

/// Scaling convention for a position attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionScaler {
    /// `(v - mean) / std`
    #[default]
    Normal,
    /// `(v - min) / (max - min)`
    MinMax,
}

/// Position attribute declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionAttribute {
    pub name: String,
    #[serde(default)]
    pub scaler: PositionScaler,
    /// Encode as `[cos v, sin v]` instead of a scaled scalar
    #[serde(default)]
    pub angular: bool,
}

impl PositionAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scaler: PositionScaler::Normal,
            angular: false,
        }
    }

    pub fn with_scaler(mut self, scaler: PositionScaler) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn angular(mut self) -> Self {
        self.angular = true;
        self
    }

    /// Number of feature columns this attribute occupies
    pub fn width(&self) -> usize {
        if self.angular {
            2
        } else {
            1
        }
    }
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

/// Full declaration of model inputs and outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Experiment id column shared by both tables
    #[serde(default = "default_index")]
    pub index: String,
    /// Process parameters in feature order
    #[serde(default)]
    pub process_parameters: Vec<ProcessParameter>,
    /// Position attributes, appended after the process parameters
    pub positions: Vec<PositionAttribute>,
    /// Output attributes in target order
    pub outputs: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            index: default_index(),
            process_parameters: Vec::new(),
            positions: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl FeatureSchema {
    /// Empty schema with the given join key
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    /// Build from plain name lists, `categorical` being a subset of `process`
    pub fn from_names(
        index: &str,
        process: &[&str],
        categorical: &[&str],
        positions: &[&str],
        outputs: &[&str],
    ) -> Result<Self, FeatureError> {
        if let Some(name) = categorical.iter().find(|c| !process.contains(c)) {
            return Err(FeatureError::Configuration(format!(
                "categorical attribute '{}' is not a declared process parameter",
                name
            )));
        }

        let schema = Self {
            index: index.to_string(),
            process_parameters: process
                .iter()
                .map(|&name| {
                    if categorical.contains(&name) {
                        ProcessParameter::categorical(name)
                    } else {
                        ProcessParameter::continuous(name)
                    }
                })
                .collect(),
            positions: positions.iter().map(|&p| PositionAttribute::new(p)).collect(),
            outputs: outputs.iter().map(|o| o.to_string()).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn continuous(mut self, name: impl Into<String>) -> Self {
        self.process_parameters.push(ProcessParameter::continuous(name));
        self
    }

    pub fn categorical(mut self, name: impl Into<String>) -> Self {
        self.process_parameters.push(ProcessParameter::categorical(name));
        self
    }

    pub fn position(mut self, position: PositionAttribute) -> Self {
        self.positions.push(position);
        self
    }

    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    /// Apply one scaler to every position attribute
    pub fn with_position_scaler(mut self, scaler: PositionScaler) -> Self {
        for position in &mut self.positions {
            position.scaler = scaler;
        }
        self
    }

    /// Check the declaration is usable
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.index.is_empty() {
            return Err(config("the experiment id column name is empty"));
        }
        if self.positions.is_empty() {
            return Err(config("at least one position attribute is required"));
        }
        if self.outputs.is_empty() {
            return Err(config("at least one output attribute is required"));
        }

        let mut seen = HashSet::new();
        let names = self
            .process_parameters
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.positions.iter().map(|p| p.name.as_str()))
            .chain(self.outputs.iter().map(String::as_str));
        for name in names {
            if name.is_empty() {
                return Err(config("attribute names must not be empty"));
            }
            if name == self.index {
                return Err(FeatureError::Configuration(format!(
                    "attribute '{}' collides with the experiment id column",
                    name
                )));
            }
            if !seen.insert(name) {
                return Err(FeatureError::Configuration(format!(
                    "attribute '{}' is declared more than once",
                    name
                )));
            }
        }

        if self.positions.len() > 1 {
            if let Some(p) = self.positions.iter().find(|p| p.angular) {
                return Err(FeatureError::Configuration(format!(
                    "angular encoding of '{}' requires a single position attribute, {} declared",
                    p.name,
                    self.positions.len()
                )));
            }
        }

        Ok(())
    }

    /// Require an exact number of position attributes
    pub fn require_positions(&self, count: usize) -> Result<(), FeatureError> {
        if self.positions.len() != count {
            return Err(FeatureError::Configuration(format!(
                "expected {} position attribute(s), got {}",
                count,
                self.positions.len()
            )));
        }
        Ok(())
    }

    /// Feature columns taken by the positions
    pub fn position_width(&self) -> usize {
        self.positions.iter().map(PositionAttribute::width).sum()
    }

    /// Names of the categorical process parameters
    pub fn categorical_names(&self) -> impl Iterator<Item = &str> {
        self.process_parameters
            .iter()
            .filter(|p| p.kind == ParameterKind::Categorical)
            .map(|p| p.name.as_str())
    }
}

fn config(msg: &str) -> FeatureError {
    FeatureError::Configuration(msg.to_string())
}
