//! # Tabula
//!
//! A schema-inferring active-record mapper. Entities, their extending tables
//! and the relationships between them are read from the live schema; records
//! are loaded, saved and linked without any per-table code.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! # fn main() -> tabula::Result<()> {
//! let catalog = SqliteCatalog::open_in_memory()?;
//! catalog.execute(
//!     "CREATE TABLE site (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
//! )?;
//! catalog.execute(
//!     "CREATE TABLE user (id INTEGER PRIMARY KEY, name TEXT, site_id INTEGER REFERENCES site (id))",
//! )?;
//!
//! let db = Tabula::new(catalog)?;
//! let mut site = db.new_record("site")?;
//! site.set("name", "main")?;
//! site.save()?;
//!
//! let mut user = db.new_record("user")?;
//! user.set("name", "alice")?.set("site_id", site.id())?;
//! user.save()?;
//!
//! assert_eq!(site.count_related("user", RelationQuery::new())?, 1);
//! assert_eq!(user.parent("site")?.and_then(|s| s.id()), site.id());
//! # Ok(())
//! # }
//! ```
//!
//! ## Relationships
//!
//! | Schema shape                                   | Relationship    |
//! |------------------------------------------------|-----------------|
//! | `b.a_id` and `a.b_id`                          | one-to-one      |
//! | `b.a_id` only                                  | one-to-many     |
//! | joining table `a_has_b` (or `b_has_a`)         | many-to-many    |
//!
//! Related records are reached through the typed methods on [`Record`]
//! ([`parent`](Record::parent), [`list`](Record::list), [`add`](Record::add),
//! ...) or by accessor name through [`Record::call`].

pub mod accessor;
pub mod config;
mod db;
pub mod entity;
mod record;
pub mod registry;
mod relation;

// =============================================================================
// Root-level exports
// =============================================================================

pub use accessor::{Accessor, AccessorArgs, AccessorOutput, AccessorTable, Action, View};
pub use config::{ConfigError, EntityConfig, TabulaConfig};
pub use db::Tabula;
pub use entity::{EntityType, Format, Selection};
pub use record::Record;
pub use registry::{EntityDef, EntitySchema, Registry, RegistryBuilder};
pub use relation::RelationQuery;

/// Result type for mapper operations
pub use tabula_core::Result;

/// Error types
pub mod error {
    pub use tabula_core::error::{ConstraintKind, ConstraintViolation, TabulaError};
}

/// Query building: projections, modifiers and write statements.
pub mod query {
    pub use tabula_core::query::*;
}

pub use tabula_core::{
    Dialect, Relationship, Row, SchemaCatalog, TemporalKind, Value, datetime, relationship,
};

#[cfg(feature = "rusqlite")]
pub use tabula_sqlite::SqliteCatalog;

/// Everything needed to open a database, query entities and follow
/// relationships.
pub mod prelude {
    pub use crate::error::{ConstraintKind, TabulaError};
    pub use crate::query::{Modifier, Operator, Select};
    pub use crate::{
        AccessorArgs, AccessorOutput, EntityType, Format, Record, RelationQuery, Relationship,
        Row, SchemaCatalog, Tabula, TabulaConfig, Value,
    };

    #[cfg(feature = "rusqlite")]
    pub use crate::SqliteCatalog;
}
