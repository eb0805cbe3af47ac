//! Configuration types for tabula.toml

use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_core::TabulaError;

/// Entity declaration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EntityConfig {
    /// Unprefixed table name
    pub name: String,
    /// Overrides the global primary key name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Extending table suffixes: `profile` for `<name>_profile`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extending: Vec<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl EntityConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            extending: Vec::new(),
            read_only: false,
        }
    }
}

/// Main configuration struct for tabula.toml
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TabulaConfig {
    /// Table-name prefix; must match the catalog's
    #[serde(default)]
    pub prefix: String,
    /// Default primary key name
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Default DISTINCT flag for selects and relation lists
    #[serde(default = "default_true")]
    pub distinct: bool,
    /// Wrap multi-table saves and deletes in a savepoint
    #[serde(default)]
    pub atomic_saves: bool,
    /// Register every catalog table as an entity
    #[serde(default = "default_true")]
    pub discover: bool,
    /// Columns maintained by the database; never written, never returned in
    /// array rows
    #[serde(default = "default_timestamp_columns")]
    pub timestamp_columns: Vec<String>,
    #[serde(default, rename = "entity", skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityConfig>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timestamp_columns() -> Vec<String> {
    vec!["create_timestamp".to_string(), "update_timestamp".to_string()]
}

impl Default for TabulaConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            primary_key: default_primary_key(),
            distinct: default_true(),
            atomic_saves: false,
            discover: default_true(),
            timestamp_columns: default_timestamp_columns(),
            entities: Vec::new(),
        }
    }
}

impl TabulaConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Declares (or replaces) an entity.
    pub fn with_entity(mut self, entity: EntityConfig) -> Self {
        self.entities.retain(|e| e.name != entity.name);
        self.entities.push(entity);
        self
    }

    pub fn is_timestamp_column(&self, column: &str) -> bool {
        self.timestamp_columns.iter().any(|c| c == column)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<ConfigError> for TabulaError {
    fn from(err: ConfigError) -> Self {
        TabulaError::Config(err.to_string())
    }
}
