//! Core building blocks of the tabula mapper: dynamic values, the schema
//! catalog boundary, SQL generation and relationship inference.
//!
//! Drivers depend on this crate to implement [`SchemaCatalog`]; the mapper in
//! the `tabula` crate is written purely against that trait.

pub mod catalog;
pub mod datetime;
pub mod dialect;
pub mod error;
pub mod query;
pub mod relationship;
pub mod row;
pub mod tracing;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[doc(hidden)]
pub use ::tracing as __tracing;

pub use catalog::{SchemaCatalog, format_sql_literal, parse_enum_values};
pub use datetime::TemporalKind;
pub use dialect::Dialect;
pub use error::{ConstraintKind, ConstraintViolation, Result, TabulaError};
pub use query::{Modifier, Operator, Select};
pub use relationship::{Relationship, RelationshipCache, ResolvedRelationship};
pub use row::Row;
pub use value::Value;
