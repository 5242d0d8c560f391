//! Data models the query engine runs over.

pub mod row;
pub mod value;

pub use row::Row;
pub use value::Value;
