//! Aggregation of monitoring data into the report matrix.

pub mod aggregator;
pub mod matrix;

pub use aggregator::*;
pub use matrix::ResultMatrix;
