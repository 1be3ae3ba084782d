//! Feature Engineering Engine
//!
//! Turns design-of-experiments parameters and spatial positions into the
//! fixed-width feature vectors a surrogate model consumes, and maps model
//! outputs back to physical units.
//!
//! Column order of every feature vector is: process parameters in
//! declaration order (categorical ones one-hot encoded), then position
//! attributes in declaration order. Training and inference share this
//! encoder, so the order never drifts between the two.

mod encoder;
mod error;
mod registry;
mod sampling;
mod scaler;
mod schema;
mod statistics;

pub use encoder::{one_hot, FeatureEncoder, ProcessParameters};
pub use error::FeatureError;
pub use registry::{AttributeRegistry, OutputEntry, PositionEntry, ProcessEncoding, ProcessEntry};
pub use sampling::{grid_2d, linspace};
pub use scaler::OutputScaler;
pub use schema::{FeatureSchema, ParameterKind, PositionAttribute, PositionScaler, ProcessParameter};
pub use statistics::ColumnStats;
