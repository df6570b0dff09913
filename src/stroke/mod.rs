//! Stroke sampling and feature extraction
//!
//! Metrics are free functions over the sample slice, grouped by the series they
//! read:
//!
//! - [`position`]: coordinates only
//! - [`pressure`]: pressure and contact measurements
//! - [`kinematics`]: coordinates over time (velocity, acceleration, turning)
//!
//! None of them fail. Too-short or degenerate input yields 0.

pub mod features;
pub mod kinematics;
pub mod position;
pub mod pressure;
pub mod types;

pub use features::{FeatureExtractor, FeatureRecord};
pub use types::{Stroke, StrokeAssembler, TouchEvent, TouchSample};
