//! Attribute Values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Experiment identifier (the design table key)
pub type DoeId = i64;

/// Raw value of a design table cell.
///
/// Process parameters are usually numeric, but categorical ones may be
/// recorded as text codes (tool ids and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Numeric value
    Number(f64),
    /// Text code
    Text(String),
}

impl AttrValue {
    /// Numeric value, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Text(_) => None,
        }
    }

    /// Whether the value can be used in arithmetic
    pub fn is_finite(&self) -> bool {
        match self {
            AttrValue::Number(v) => v.is_finite(),
            AttrValue::Text(_) => true,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Number(v) => write!(f, "{}", v),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Number(v as f64)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Number(f64::from(v))
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(AttrValue::from(3).as_number(), Some(3.0));
        assert_eq!(AttrValue::from(2.5).as_number(), Some(2.5));
        assert_eq!(AttrValue::from("A").as_number(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(AttrValue::from(1.5).to_string(), "1.5");
        assert_eq!(AttrValue::from("P2").to_string(), "P2");
    }

    #[test]
    fn test_finite() {
        assert!(AttrValue::from("x").is_finite());
        assert!(!AttrValue::from(f64::NAN).is_finite());
    }
}
