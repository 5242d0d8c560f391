//! Configuration for query evaluation.

pub mod comparison;

pub use comparison::{CaseSensitivity, ComparisonConfig};
