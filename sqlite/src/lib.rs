//! SQLite schema catalog for tabula
//!
//! Introspects tables through `sqlite_master` and the `table_xinfo`,
//! `index_list` and `index_info` pragmas, runs the mapper's statements on a
//! rusqlite connection and classifies constraint failures.

pub mod introspect;
pub mod pragma;

#[cfg(feature = "rusqlite")]
mod catalog;
#[cfg(feature = "rusqlite")]
pub mod convert;

#[cfg(feature = "rusqlite")]
pub use catalog::SqliteCatalog;
