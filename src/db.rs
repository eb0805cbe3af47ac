//! The mapper handle: a catalog, its configuration, the entity registry and
//! the relationship cache.

use std::sync::atomic::{AtomicU32, Ordering};

use tabula_core::{
    Relationship, RelationshipCache, ResolvedRelationship, Result, SchemaCatalog, TabulaError,
    tabula_trace_query,
};

use crate::config::TabulaConfig;
use crate::entity::EntityType;
use crate::record::Record;
use crate::registry::Registry;

/// Entry point of the mapper.
///
/// ```ignore
/// let db = Tabula::new(SqliteCatalog::open_in_memory()?)?;
/// let mut user = db.new_record("user")?;
/// user.set("name", "alice")?;
/// user.save()?;
/// ```
#[derive(Debug)]
pub struct Tabula<C: SchemaCatalog> {
    catalog: C,
    config: TabulaConfig,
    registry: Registry,
    relationships: RelationshipCache,
    savepoint_depth: AtomicU32,
}

impl<C: SchemaCatalog> Tabula<C> {
    /// Default configuration with the catalog's own prefix.
    pub fn new(catalog: C) -> Result<Self> {
        let config = TabulaConfig {
            prefix: catalog.get_prefix().to_string(),
            ..TabulaConfig::default()
        };
        Self::from_config(catalog, config)
    }

    pub fn from_config(catalog: C, config: TabulaConfig) -> Result<Self> {
        if config.prefix != catalog.get_prefix() {
            return Err(TabulaError::Config(format!(
                "prefix \"{}\" does not match the catalog prefix \"{}\"",
                config.prefix,
                catalog.get_prefix()
            )));
        }
        let registry = Registry::build(&catalog, &config)?;
        Ok(Self {
            catalog,
            config,
            registry,
            relationships: RelationshipCache::new(),
            savepoint_depth: AtomicU32::new(0),
        })
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &TabulaConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }

    /// Handle for entity-level queries.
    pub fn entity(&self, name: &str) -> Result<EntityType<'_, C>> {
        Ok(EntityType::new(self, self.registry.entity(name)?))
    }

    /// A new, unsaved record filled with column defaults.
    pub fn new_record(&self, name: &str) -> Result<Record<'_, C>> {
        Ok(Record::new(self, self.registry.entity(name)?))
    }

    /// Loads an existing record.
    pub fn load(&self, name: &str, id: i64) -> Result<Record<'_, C>> {
        if id <= 0 {
            return Err(TabulaError::argument("id", id));
        }
        let mut record = self.new_record(name)?;
        record.load_id(id)?;
        Ok(record)
    }

    /// How `a` relates to `b`, entity names unprefixed.
    pub fn relationship(&self, a: &str, b: &str) -> Result<Relationship> {
        Ok(self.resolve(a, b)?.kind)
    }

    /// Physical joining table of a many-to-many pair.
    pub fn joining_table(&self, a: &str, b: &str) -> Result<Option<String>> {
        Ok(self.resolve(a, b)?.joining_table)
    }

    /// Re-reads the schema: registry, accessor tables and relationships.
    pub fn refresh(&mut self) -> Result<()> {
        self.registry = Registry::build(&self.catalog, &self.config)?;
        self.relationships.clear();
        tracing::debug!(entities = self.registry.len(), "tabula.refresh");
        Ok(())
    }

    pub(crate) fn resolve(&self, a: &str, b: &str) -> Result<ResolvedRelationship> {
        self.relationships.get(&self.catalog, a, b)
    }

    pub(crate) fn execute(&self, sql: &str) -> Result<u64> {
        tabula_trace_query!(sql);
        self.catalog.execute(sql)
    }

    /// Runs `f` inside a savepoint when `atomic_saves` is on; otherwise just
    /// runs it.
    ///
    /// On `Err` (or a panic) everything `f` wrote is rolled back. Nested
    /// calls get their own savepoint.
    pub(crate) fn atomic<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        if !self.config.atomic_saves {
            return f();
        }
        let depth = self.savepoint_depth.load(Ordering::Relaxed);
        let sp_name = format!("tabula_write_{depth}");
        self.savepoint_depth.store(depth + 1, Ordering::Relaxed);

        if let Err(e) = self.execute(&format!("SAVEPOINT {sp_name}")) {
            self.savepoint_depth.store(depth, Ordering::Relaxed);
            return Err(e);
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        self.savepoint_depth.store(depth, Ordering::Relaxed);

        match result {
            Ok(Ok(value)) => {
                self.execute(&format!("RELEASE SAVEPOINT {sp_name}"))?;
                Ok(value)
            }
            Ok(Err(e)) => {
                let _ = self.execute(&format!("ROLLBACK TO SAVEPOINT {sp_name}"));
                let _ = self.execute(&format!("RELEASE SAVEPOINT {sp_name}"));
                Err(e)
            }
            Err(panic_payload) => {
                let _ = self.execute(&format!("ROLLBACK TO SAVEPOINT {sp_name}"));
                let _ = self.execute(&format!("RELEASE SAVEPOINT {sp_name}"));
                std::panic::resume_unwind(panic_payload);
            }
        }
    }
}

#[cfg(feature = "rusqlite")]
impl Tabula<tabula_sqlite::SqliteCatalog> {
    /// An in-memory SQLite database with `config.prefix` applied.
    pub fn open_in_memory(config: TabulaConfig) -> Result<Self> {
        let catalog =
            tabula_sqlite::SqliteCatalog::open_in_memory()?.with_prefix(config.prefix.clone());
        Self::from_config(catalog, config)
    }

    pub fn open(path: impl AsRef<std::path::Path>, config: TabulaConfig) -> Result<Self> {
        let catalog =
            tabula_sqlite::SqliteCatalog::open(path)?.with_prefix(config.prefix.clone());
        Self::from_config(catalog, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::testing::MockCatalog;

    fn catalog() -> MockCatalog {
        MockCatalog::new()
            .table("user", &["name", "site_id"])
            .table("site", &["name"])
            .table("role", &["name"])
            .table("user_has_role", &["user_id", "role_id"])
    }

    #[test]
    fn builds_registry_from_catalog() {
        let db = Tabula::new(catalog()).unwrap();
        let mut names: Vec<&str> = db.registry().names().collect();
        names.sort_unstable();
        assert_eq!(names, ["role", "site", "user"]);
        assert!(db.entity("user_has_role").is_err());
    }

    #[test]
    fn prefix_mismatch_is_a_config_error() {
        let config = TabulaConfig {
            prefix: "app_".into(),
            ..TabulaConfig::default()
        };
        let err = Tabula::from_config(catalog(), config).unwrap_err();
        assert!(matches!(err, TabulaError::Config(_)));
    }

    #[test]
    fn relationships_are_cached() {
        let db = Tabula::new(catalog()).unwrap();
        assert_eq!(db.relationship("site", "user").unwrap(), Relationship::OneToMany);
        assert_eq!(db.relationship("user", "role").unwrap(), Relationship::ManyToMany);
        assert_eq!(
            db.joining_table("role", "user").unwrap().as_deref(),
            Some("user_has_role")
        );
        assert_eq!(db.relationship("role", "site").unwrap(), Relationship::None);
    }

    #[test]
    fn load_rejects_bad_ids() {
        let db = Tabula::new(catalog()).unwrap();
        assert!(db.load("user", 0).unwrap_err().is_argument());
        assert!(db.load("nobody", 1).unwrap_err().is_argument());
    }

    #[test]
    fn atomic_wraps_in_savepoint() {
        let config = TabulaConfig {
            atomic_saves: true,
            ..TabulaConfig::default()
        };
        let db = Tabula::from_config(catalog(), config).unwrap();
        let err = db
            .atomic(|| -> Result<()> {
                db.execute("DELETE FROM user WHERE id = 1")?;
                Err(TabulaError::Validation("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, TabulaError::Validation(_)));
        let executed = db.catalog().executed();
        assert_eq!(
            executed,
            [
                "SAVEPOINT tabula_write_0",
                "DELETE FROM user WHERE id = 1",
                "ROLLBACK TO SAVEPOINT tabula_write_0",
                "RELEASE SAVEPOINT tabula_write_0",
            ]
        );
    }
}
