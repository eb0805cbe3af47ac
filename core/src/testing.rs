//! An in-memory [`SchemaCatalog`] for unit tests: schema metadata only, no
//! statement execution.

use std::cell::{Cell, RefCell};

use crate::{Dialect, Result, Row, SchemaCatalog, TabulaError, Value, format_sql_literal};

#[derive(Clone, Debug, Default)]
struct MockColumn {
    name: String,
    ty: String,
    default: Option<Value>,
}

#[derive(Clone, Debug, Default)]
struct MockTable {
    name: String,
    columns: Vec<MockColumn>,
    primary_key: Vec<String>,
    unique: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct MockCatalog {
    prefix: String,
    tables: Vec<MockTable>,
    version: Cell<u64>,
    executed: RefCell<Vec<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Adds a table whose primary key is `id` plus the given columns.
    pub fn table(mut self, name: &str, columns: &[&str]) -> Self {
        let mut table = MockTable {
            name: name.to_string(),
            primary_key: vec!["id".to_string()],
            ..Default::default()
        };
        table.columns.push(MockColumn {
            name: "id".into(),
            ty: "integer".into(),
            default: None,
        });
        for column in columns {
            table.columns.push(MockColumn {
                name: column.to_string(),
                ty: "text".into(),
                default: None,
            });
        }
        self.tables.push(table);
        self
    }

    /// Adds a table keyed by the given columns, for joining and extending tables.
    pub fn keyed_table(mut self, name: &str, key: &[&str], columns: &[&str]) -> Self {
        let table = MockTable {
            name: name.to_string(),
            columns: key
                .iter()
                .chain(columns)
                .map(|c| MockColumn {
                    name: c.to_string(),
                    ty: "integer".into(),
                    default: None,
                })
                .collect(),
            primary_key: key.iter().map(|c| c.to_string()).collect(),
            unique: Vec::new(),
        };
        self.tables.push(table);
        self
    }

    pub fn unique(mut self, table: &str, columns: &[&str]) -> Self {
        if let Some(t) = self.tables.iter_mut().find(|t| t.name == table) {
            t.unique.push(columns.iter().map(|c| c.to_string()).collect());
        }
        self
    }

    pub fn default_value(mut self, table: &str, column: &str, value: Value) -> Self {
        if let Some(c) = self
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .and_then(|t| t.columns.iter_mut().find(|c| c.name == column))
        {
            c.default = Some(value);
        }
        self
    }

    pub fn column_type(mut self, table: &str, column: &str, ty: &str) -> Self {
        if let Some(c) = self
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .and_then(|t| t.columns.iter_mut().find(|c| c.name == column))
        {
            c.ty = ty.to_string();
        }
        self
    }

    pub fn bump_version(&self) {
        self.version.set(self.version.get() + 1);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    fn find(&self, table: &str) -> Result<&MockTable> {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| TabulaError::Schema(format!("no table {table}")))
    }

    fn find_column(&self, table: &str, column: &str) -> Result<&MockColumn> {
        self.find(table)?
            .columns
            .iter()
            .find(|c| c.name == column)
            .ok_or_else(|| TabulaError::Schema(format!("no column {table}.{column}")))
    }
}

impl SchemaCatalog for MockCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn get_prefix(&self) -> &str {
        &self.prefix
    }

    fn schema_version(&self) -> Result<u64> {
        Ok(self.version.get())
    }

    fn get_table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.tables.iter().any(|t| t.name == table))
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .tables
            .iter()
            .any(|t| t.name == table && t.columns.iter().any(|c| c.name == column)))
    }

    fn get_column_names(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.find(table)?.columns.iter().map(|c| c.name.clone()).collect())
    }

    fn get_column_default(&self, table: &str, column: &str) -> Result<Option<Value>> {
        Ok(self.find_column(table, column)?.default.clone())
    }

    fn get_column_type(&self, table: &str, column: &str) -> Result<String> {
        Ok(self.find_column(table, column)?.ty.clone())
    }

    fn get_primary_key(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.find(table)?.primary_key.clone())
    }

    fn get_unique_keys(&self, table: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.find(table)?.unique.clone())
    }

    fn get_one(&self, sql: &str) -> Result<Option<Value>> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(None)
    }

    fn get_row(&self, sql: &str) -> Result<Option<Row>> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(None)
    }

    fn get_all(&self, sql: &str) -> Result<Vec<Row>> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(Vec::new())
    }

    fn get_col(&self, sql: &str) -> Result<Vec<Value>> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(Vec::new())
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(0)
    }

    fn insert_id(&self) -> Result<i64> {
        Ok(0)
    }

    fn format_string(&self, value: &Value) -> String {
        format_sql_literal(value)
    }
}
