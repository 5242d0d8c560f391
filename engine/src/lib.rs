//! logsql engine
//!
//! This crate contains the query engine behind `logsql`: a lexer and parser for a small
//! SQL-like language, and an executor that runs parsed queries over rows of log fields.
//! It does not read files or print anything; rows come from the caller.
//!
//! # Modules
//!
//! - [`models`] - Rows and values
//! - [`query`] - Lexing, parsing, evaluation and execution
//! - [`config`] - Comparison settings
//!
//! # Example
//!
//! ```
//! use engine::models::Row;
//! use engine::query::run_query;
//!
//! let rows = vec![
//!     Row::new().with_field("level", "warn").with_field("service", "db"),
//!     Row::new().with_field("level", "error").with_field("service", "api"),
//!     Row::new().with_field("level", "error").with_field("service", "db"),
//! ];
//!
//! let result = run_query(
//!     "SELECT service WHERE level = 'error' ORDER BY service DESC",
//!     ["level", "service"],
//!     rows,
//! )
//! .unwrap();
//!
//! let services: Vec<String> = result
//!     .map(|row| row.get("service").unwrap().to_string())
//!     .collect();
//! assert_eq!(services, vec!["db", "api"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod models;
pub mod query;

/// Re-export common dependencies for convenience.
pub use serde;
