//! Entity registry: the schema of every mapped entity, validated and
//! resolved once at start-up.
//!
//! An entity is a primary table plus zero or more extending tables named
//! `<entity>_<suffix>` whose key column `<entity>_<primary_key>` carries the
//! primary row's id. Attribute names resolve to a `(table, column)` pair here
//! so records never search table namespaces on get/set.

use compact_str::{CompactString, format_compact};
use hashbrown::HashMap;
use tabula_core::relationship::{foreign_key, is_joining_table_name, physical_table};
use tabula_core::{Result, SchemaCatalog, TabulaError, TemporalKind, Value};

use crate::accessor::AccessorTable;
use crate::config::{EntityConfig, TabulaConfig};

/// Declaration of one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDef {
    pub name: String,
    pub primary_key: String,
    pub extending: Vec<String>,
    pub read_only: bool,
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            extending: Vec::new(),
            read_only: false,
        }
    }

    #[inline]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Adds the extending table `<name>_<suffix>`.
    #[inline]
    pub fn extending(mut self, suffix: impl Into<String>) -> Self {
        self.extending.push(suffix.into());
        self
    }

    #[inline]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    fn from_config(entity: &EntityConfig, default_key: &str) -> Self {
        Self {
            name: entity.name.clone(),
            primary_key: entity
                .primary_key
                .clone()
                .unwrap_or_else(|| default_key.to_string()),
            extending: entity.extending.clone(),
            read_only: entity.read_only,
        }
    }
}

/// Column metadata captured at build time.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    /// Catalog default, unresolved (`CURRENT_TIMESTAMP` stays text)
    pub default: Option<Value>,
    pub temporal: Option<TemporalKind>,
}

/// One physical table of an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    /// Physical name, prefix included
    pub name: String,
    /// `None` for the primary table
    pub suffix: Option<String>,
    /// Primary key of the primary table, `<entity>_<pk>` of an extending one
    pub key: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn is_extending(&self) -> bool {
        self.suffix.is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}

/// Where an attribute lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub table: usize,
    pub column: usize,
}

/// Resolved schema of one entity.
#[derive(Clone, Debug)]
pub struct EntitySchema {
    pub name: String,
    pub primary_key: String,
    pub read_only: bool,
    /// Primary table first, then extending tables in declaration order
    pub tables: Vec<TableSchema>,
    pub accessors: AccessorTable,
    fields: HashMap<CompactString, FieldRef>,
    field_order: Vec<CompactString>,
}

impl EntitySchema {
    pub fn primary(&self) -> &TableSchema {
        &self.tables[0]
    }

    pub fn table_name(&self) -> &str {
        &self.tables[0].name
    }

    pub fn field(&self, name: &str) -> Option<FieldRef> {
        self.fields.get(name).copied()
    }

    pub fn column(&self, field: FieldRef) -> &ColumnSchema {
        &self.tables[field.table].columns[field.column]
    }

    /// Attribute names: primary columns in order, then extending ones.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.field_order.iter().map(CompactString::as_str)
    }

    /// Reverse lookup of [`field`](Self::field).
    pub fn attribute_name(&self, field: FieldRef) -> Option<&str> {
        self.field_order
            .iter()
            .find(|name| self.fields.get(name.as_str()) == Some(&field))
            .map(CompactString::as_str)
    }

    /// Whether the primary table (or, with `include_extending`, any table)
    /// has the column. Extending columns are matched by their own names.
    pub fn has_column(&self, column: &str, include_extending: bool) -> bool {
        let tables = if include_extending {
            &self.tables[..]
        } else {
            &self.tables[..1]
        };
        tables.iter().any(|t| t.has_column(column))
    }

    fn resolve_fields(&mut self) {
        self.fields.clear();
        self.field_order.clear();
        for (column, info) in self.tables[0].columns.iter().enumerate() {
            let name = CompactString::from(info.name.as_str());
            self.fields.insert(name.clone(), FieldRef { table: 0, column });
            self.field_order.push(name);
        }
        for (table, schema) in self.tables.iter().enumerate().skip(1) {
            let Some(suffix) = &schema.suffix else {
                continue;
            };
            for (column, info) in schema.columns.iter().enumerate() {
                if info.name == schema.key {
                    continue;
                }
                let name = format_compact!("{suffix}_{}", info.name);
                // extending columns shadow primary columns of the same name
                if self.fields.insert(name.clone(), FieldRef { table, column }).is_none() {
                    self.field_order.push(name);
                }
            }
        }
    }
}

fn temporal_kind(catalog: &dyn SchemaCatalog, column: &str) -> Option<TemporalKind> {
    if catalog.is_datetime_column(column) {
        Some(TemporalKind::DateTime)
    } else if catalog.is_time_column(column) {
        Some(TemporalKind::Time)
    } else {
        None
    }
}

fn load_table(
    catalog: &dyn SchemaCatalog,
    name: String,
    suffix: Option<String>,
    key: String,
) -> Result<TableSchema> {
    let mut columns = Vec::new();
    for column in catalog.get_column_names(&name)? {
        columns.push(ColumnSchema {
            default: catalog.get_column_default(&name, &column)?,
            temporal: temporal_kind(catalog, &column),
            name: column,
        });
    }
    Ok(TableSchema {
        name,
        suffix,
        key,
        columns,
    })
}

/// Every registered entity.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entities: Vec<EntitySchema>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Builds the registry described by `config`.
    pub fn build(catalog: &dyn SchemaCatalog, config: &TabulaConfig) -> Result<Registry> {
        let mut builder = Registry::builder()
            .default_primary_key(config.primary_key.clone())
            .discover(config.discover);
        for entity in &config.entities {
            builder = builder.entity(EntityDef::from_config(entity, &config.primary_key));
        }
        builder.build(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// Like [`get`](Self::get) but an unknown name is an argument error.
    pub fn entity(&self, name: &str) -> Result<&EntitySchema> {
        self.get(name)
            .ok_or_else(|| TabulaError::argument("entity", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entity names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Collects entity declarations for [`Registry`].
#[derive(Clone, Debug)]
pub struct RegistryBuilder {
    defs: Vec<EntityDef>,
    discover: bool,
    default_primary_key: String,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            defs: Vec::new(),
            discover: false,
            default_primary_key: "id".to_string(),
        }
    }
}

impl RegistryBuilder {
    /// Declares an entity; a later declaration of the same name replaces it.
    #[inline]
    pub fn entity(mut self, def: EntityDef) -> Self {
        self.defs.retain(|d| d.name != def.name);
        self.defs.push(def);
        self
    }

    /// Also register every other table with a single `id`-style key.
    #[inline]
    pub fn discover(mut self, discover: bool) -> Self {
        self.discover = discover;
        self
    }

    #[inline]
    pub fn default_primary_key(mut self, key: impl Into<String>) -> Self {
        self.default_primary_key = key.into();
        self
    }

    pub fn build(self, catalog: &dyn SchemaCatalog) -> Result<Registry> {
        let mut defs = self.defs;
        if self.discover {
            let discovered = discover_entities(catalog, &defs, &self.default_primary_key)?;
            defs.extend(discovered);
        }

        let mut registry = Registry::default();
        for def in &defs {
            let schema = validate_entity(catalog, def)?;
            registry.index.insert(def.name.clone(), registry.entities.len());
            registry.entities.push(schema);
        }

        let names: Vec<String> = registry.entities.iter().map(|e| e.name.clone()).collect();
        for entity in &mut registry.entities {
            let mut accessors = AccessorTable::new();
            for subject in &names {
                let with_parent = entity.primary().has_column(&foreign_key(subject));
                accessors.register_subject(subject, with_parent);
            }
            entity.accessors = accessors;
        }

        tracing::debug!(entities = registry.len(), "tabula.registry");
        Ok(registry)
    }
}

fn discover_entities(
    catalog: &dyn SchemaCatalog,
    declared: &[EntityDef],
    default_primary_key: &str,
) -> Result<Vec<EntityDef>> {
    let prefix = catalog.get_prefix();
    let extending: Vec<String> = declared
        .iter()
        .flat_map(|d| d.extending.iter().map(move |s| format!("{}_{s}", d.name)))
        .collect();

    let mut found = Vec::new();
    for table in catalog.get_table_names()? {
        let Some(name) = table.strip_prefix(prefix) else {
            continue;
        };
        if name.is_empty()
            || is_joining_table_name(name)
            || extending.iter().any(|e| e == name)
            || declared.iter().any(|d| d.name == name)
        {
            continue;
        }
        if catalog.get_primary_key(&table)? != [default_primary_key] {
            tracing::debug!(table = %table, "skipping table without a single primary key column");
            continue;
        }
        found.push(EntityDef::new(name).primary_key(default_primary_key));
    }
    Ok(found)
}

fn validate_entity(catalog: &dyn SchemaCatalog, def: &EntityDef) -> Result<EntitySchema> {
    let table = physical_table(catalog, &def.name);
    if !catalog.table_exists(&table)? {
        return Err(TabulaError::Schema(format!("table {table} does not exist")));
    }
    let key = catalog.get_primary_key(&table)?;
    match key.as_slice() {
        [] => {
            return Err(TabulaError::Schema(format!("table {table} has no primary key")));
        }
        [single] if *single == def.primary_key => {}
        [single] => {
            return Err(TabulaError::Schema(format!(
                "table {table} has primary key {single}, expected {}",
                def.primary_key
            )));
        }
        _ => {
            return Err(TabulaError::Schema(format!(
                "table {table} has a multi-column primary key"
            )));
        }
    }

    let mut tables = vec![load_table(catalog, table, None, def.primary_key.clone())?];
    let extending_key = format!("{}_{}", def.name, def.primary_key);
    for suffix in &def.extending {
        let name = physical_table(catalog, &format!("{}_{suffix}", def.name));
        if !catalog.table_exists(&name)? {
            return Err(TabulaError::Schema(format!(
                "extending table {name} does not exist"
            )));
        }
        if !catalog.column_exists(&name, &extending_key)? {
            return Err(TabulaError::Schema(format!(
                "extending table {name} has no key column {extending_key}"
            )));
        }
        tables.push(load_table(
            catalog,
            name,
            Some(suffix.clone()),
            extending_key.clone(),
        )?);
    }

    let mut schema = EntitySchema {
        name: def.name.clone(),
        primary_key: def.primary_key.clone(),
        read_only: def.read_only,
        tables,
        accessors: AccessorTable::new(),
        fields: HashMap::new(),
        field_order: Vec::new(),
    };
    schema.resolve_fields();
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::testing::MockCatalog;

    fn catalog() -> MockCatalog {
        MockCatalog::new()
            .table("user", &["name", "site_id", "bio"])
            .keyed_table("user_profile", &["user_id"], &["bio", "phone"])
            .table("site", &["name"])
            .table("role", &["name"])
            .keyed_table("user_has_role", &["user_id", "role_id"], &[])
    }

    #[test]
    fn resolves_extending_fields() {
        let registry = Registry::builder()
            .entity(EntityDef::new("user").extending("profile"))
            .build(&catalog())
            .unwrap();
        let user = registry.entity("user").unwrap();
        assert_eq!(user.tables.len(), 2);
        assert_eq!(
            user.field("profile_phone"),
            Some(FieldRef { table: 1, column: 2 })
        );
        assert_eq!(user.field("name"), Some(FieldRef { table: 0, column: 1 }));
        // the key column of an extending table is internal
        assert_eq!(user.field("profile_user_id"), None);
        assert_eq!(
            user.field_names().collect::<Vec<_>>(),
            ["id", "name", "site_id", "bio", "profile_bio", "profile_phone"]
        );
        assert_eq!(
            user.attribute_name(FieldRef { table: 1, column: 1 }),
            Some("profile_bio")
        );
        assert!(user.has_column("phone", true));
        assert!(!user.has_column("phone", false));
    }

    #[test]
    fn discovery_skips_joining_and_extending_tables() {
        let registry = Registry::builder()
            .entity(EntityDef::new("user").extending("profile"))
            .discover(true)
            .build(&catalog())
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["user", "site", "role"]);
    }

    #[test]
    fn discovery_without_declarations_skips_keyed_tables() {
        let registry = Registry::builder().discover(true).build(&catalog()).unwrap();
        assert!(!registry.contains("user_profile"));
        assert!(registry.contains("user"));
    }

    #[test]
    fn accessor_tables() {
        let registry = Registry::builder()
            .discover(true)
            .build(&catalog())
            .unwrap();
        let user = registry.entity("user").unwrap();
        assert!(user.accessors.contains("get_site"));
        assert!(user.accessors.contains("get_role_list_inverted"));
        assert!(user.accessors.contains("add_role"));
        assert!(!user.accessors.contains("get_role"));
        assert!(!user.accessors.contains("get_nothing_list"));
    }

    #[test]
    fn invalid_declarations() {
        let err = Registry::builder()
            .entity(EntityDef::new("missing"))
            .build(&catalog())
            .unwrap_err();
        assert!(matches!(err, TabulaError::Schema(_)));

        let err = Registry::builder()
            .entity(EntityDef::new("user").primary_key("user_id"))
            .build(&catalog())
            .unwrap_err();
        assert!(matches!(err, TabulaError::Schema(_)));

        let err = Registry::builder()
            .entity(EntityDef::new("user").extending("settings"))
            .build(&catalog())
            .unwrap_err();
        assert!(matches!(err, TabulaError::Schema(_)));

        let err = Registry::builder()
            .entity(EntityDef::new("user_has_role"))
            .build(&catalog())
            .unwrap_err();
        assert!(err.to_string().contains("multi-column"));
    }
}
