//! Relationship inference from schema shape.
//!
//! Entity names here are unprefixed: `user`, `role`. Physical table names get
//! the catalog prefix, foreign-key columns do not (`<prefix>role.user_id`).

use core::fmt;
use std::sync::RwLock;

use hashbrown::HashMap;

use crate::{Result, SchemaCatalog};

/// How one entity relates to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Relationship {
    #[default]
    None,
    /// Both tables hold each other's foreign key
    OneToOne,
    /// The other table holds this table's foreign key
    OneToMany,
    /// Linked through a `<a>_has_<b>` table
    ManyToMany,
}

impl Relationship {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Relationship::None => "NONE",
            Relationship::OneToOne => "ONE_TO_ONE",
            Relationship::OneToMany => "ONE_TO_MANY",
            Relationship::ManyToMany => "MANY_TO_MANY",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<prefix><name>`
pub fn physical_table(catalog: &dyn SchemaCatalog, name: &str) -> String {
    format!("{}{name}", catalog.get_prefix())
}

/// `<name>_id`
pub fn foreign_key(name: &str) -> String {
    format!("{name}_id")
}

/// Whether an unprefixed table name looks like a joining table.
pub fn is_joining_table_name(name: &str) -> bool {
    name.contains("_has_")
}

/// The physical name of the joining table between `a` and `b`, trying
/// `<a>_has_<b>` before `<b>_has_<a>`.
pub fn find_joining_table(catalog: &dyn SchemaCatalog, a: &str, b: &str) -> Result<Option<String>> {
    for candidate in [format!("{a}_has_{b}"), format!("{b}_has_{a}")] {
        let table = physical_table(catalog, &candidate);
        if catalog.table_exists(&table)? {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// Classifies `self_name` against `other_name`. Foreign keys are checked
/// before joining tables.
pub fn resolve_relationship(
    catalog: &dyn SchemaCatalog,
    self_name: &str,
    other_name: &str,
) -> Result<Relationship> {
    let self_table = physical_table(catalog, self_name);
    let other_table = physical_table(catalog, other_name);

    if catalog.column_exists(&other_table, &foreign_key(self_name))? {
        return Ok(if catalog.column_exists(&self_table, &foreign_key(other_name))? {
            Relationship::OneToOne
        } else {
            Relationship::OneToMany
        });
    }
    if find_joining_table(catalog, self_name, other_name)?.is_some() {
        return Ok(Relationship::ManyToMany);
    }
    Ok(Relationship::None)
}

/// A resolved pair: the relationship and, for many-to-many, the physical
/// joining table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRelationship {
    pub kind: Relationship,
    pub joining_table: Option<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    version: Option<u64>,
    entries: HashMap<(String, String), ResolvedRelationship>,
}

/// Memoizes [`resolve_relationship`] per entity pair for one schema version.
#[derive(Debug, Default)]
pub struct RelationshipCache {
    state: RwLock<CacheState>,
}

impl RelationshipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        catalog: &dyn SchemaCatalog,
        self_name: &str,
        other_name: &str,
    ) -> Result<ResolvedRelationship> {
        let version = catalog.schema_version()?;
        let key = (self_name.to_string(), other_name.to_string());

        if let Ok(state) = self.state.read()
            && state.version == Some(version)
            && let Some(hit) = state.entries.get(&key)
        {
            return Ok(hit.clone());
        }

        let kind = resolve_relationship(catalog, self_name, other_name)?;
        let joining_table = match kind {
            Relationship::ManyToMany => find_joining_table(catalog, self_name, other_name)?,
            _ => None,
        };
        let resolved = ResolvedRelationship {
            kind,
            joining_table,
        };

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.version != Some(version) {
            state.entries.clear();
            state.version = Some(version);
        }
        state.entries.insert(key, resolved.clone());
        Ok(resolved)
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.entries.clear();
        state.version = None;
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
