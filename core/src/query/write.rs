//! INSERT / UPDATE / DELETE statement rendering.

use super::Modifier;
use crate::{Result, SchemaCatalog, TabulaError, Value};

/// `INSERT INTO table (cols) VALUES (...), (...)`, optionally as an upsert on
/// a key column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    upsert_key: Option<String>,
}

impl InsertStatement {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Turns the insert into an update when `key` already exists.
    pub fn upsert_on(mut self, key: impl Into<String>) -> Self {
        self.upsert_key = Some(key.into());
        self
    }

    pub fn to_sql(&self, catalog: &dyn SchemaCatalog) -> Result<String> {
        if self.table.is_empty() {
            return Err(TabulaError::Query("insert without a table".into()));
        }
        let dialect = catalog.dialect();
        let mut sql = format!("INSERT INTO {}", self.table);
        if self.columns.is_empty() {
            sql.push(' ');
            sql.push_str(dialect.empty_insert());
        } else {
            if self.rows.is_empty() {
                return Err(TabulaError::Query(format!(
                    "insert into {} without values",
                    self.table
                )));
            }
            sql.push_str(&format!(" ({}) VALUES ", self.columns.join(", ")));
            let mut rows = Vec::with_capacity(self.rows.len());
            for row in &self.rows {
                if row.len() != self.columns.len() {
                    return Err(TabulaError::Query(format!(
                        "insert into {} has {} columns but a row of {} values",
                        self.table,
                        self.columns.len(),
                        row.len()
                    )));
                }
                let values = row
                    .iter()
                    .map(|v| catalog.format_string(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                rows.push(format!("({values})"));
            }
            sql.push_str(&rows.join(", "));
        }
        if let Some(key) = &self.upsert_key {
            let updates: Vec<&str> = self
                .columns
                .iter()
                .map(String::as_str)
                .filter(|c| c != key)
                .collect();
            sql.push_str(&dialect.upsert_clause(key, &updates));
        }
        Ok(sql)
    }
}

/// `UPDATE table SET ... WHERE key = id`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateStatement {
    table: String,
    key: String,
    id: Value,
    sets: Vec<(String, Value)>,
}

impl UpdateStatement {
    pub fn new(table: impl Into<String>, key: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            id: id.into(),
            sets: Vec::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.sets.push((column.into(), value));
        self
    }

    /// `None` when there is nothing to set.
    pub fn to_sql(&self, catalog: &dyn SchemaCatalog) -> Option<String> {
        if self.sets.is_empty() {
            return None;
        }
        let sets = self
            .sets
            .iter()
            .map(|(c, v)| format!("{c} = {}", catalog.format_string(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "UPDATE {} SET {sets} WHERE {} = {}",
            self.table,
            self.key,
            catalog.format_string(&self.id)
        ))
    }
}

/// `DELETE FROM table WHERE ...`; the filter comes from a modifier.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteStatement {
    table: String,
    filter: Modifier,
}

impl DeleteStatement {
    pub fn new(table: impl Into<String>, filter: Modifier) -> Self {
        Self {
            table: table.into(),
            filter,
        }
    }

    /// Refuses to render a delete without a WHERE clause.
    pub fn to_sql(&self, catalog: &dyn SchemaCatalog) -> Result<String> {
        let where_sql = self.filter.where_sql(catalog);
        if where_sql.is_empty() {
            return Err(TabulaError::Query(format!(
                "unfiltered delete from {}",
                self.table
            )));
        }
        Ok(format!("DELETE FROM {}{where_sql}", self.table))
    }
}
