//! The projection half of a SELECT statement.

use serde_json::Value as Json;

use crate::{Dialect, Result, TabulaError};

#[derive(Clone, Debug, PartialEq, Eq)]
struct SelectColumn {
    /// `None` means the table given to [`Select::from`]
    table: Option<String>,
    column: String,
    alias: String,
    table_prefix: bool,
}

/// Builds `SELECT <columns> FROM <table>`.
///
/// Joins and filters live in a separate [`Modifier`](super::Modifier); the two
/// are concatenated into the final statement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Select {
    table: String,
    alias: Option<String>,
    columns: Vec<SelectColumn>,
    distinct: bool,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base table. Joined tables belong in a modifier.
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self.alias = None;
        self
    }

    pub fn from_alias(&mut self, table: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self.alias = Some(alias.into());
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        (!self.table.is_empty()).then_some(self.table.as_str())
    }

    pub fn table_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Adds `table.column AS alias`.
    ///
    /// Any column already selected under the same alias, from any table, is
    /// replaced.
    pub fn add_table_column(
        &mut self,
        table: Option<&str>,
        column: &str,
        alias: Option<&str>,
        table_prefix: bool,
    ) -> Result<&mut Self> {
        if column.is_empty() {
            return Err(TabulaError::argument("column", "(empty)"));
        }
        if alias.is_some_and(str::is_empty) {
            return Err(TabulaError::argument("alias", "(empty)"));
        }
        let alias = alias.unwrap_or(column).to_string();
        self.columns.retain(|c| c.alias != alias);
        self.columns.push(SelectColumn {
            table: table.filter(|t| !t.is_empty()).map(str::to_string),
            column: column.to_string(),
            alias,
            table_prefix,
        });
        Ok(self)
    }

    /// Adds a column of the base table.
    pub fn add_column(&mut self, column: &str, alias: Option<&str>) -> Result<&mut Self> {
        self.add_table_column(None, column, alias, true)
    }

    /// Adds `table.*` (the base table when `table` is `None`).
    pub fn add_all_table_columns(&mut self, table: Option<&str>) -> &mut Self {
        let table = table.filter(|t| !t.is_empty()).map(str::to_string);
        let alias = match &table {
            Some(t) => format!("{t}.*"),
            None => "*".to_string(),
        };
        self.columns.retain(|c| c.alias != alias);
        self.columns.push(SelectColumn {
            table,
            column: "*".to_string(),
            alias,
            table_prefix: true,
        });
        self
    }

    /// Removes columns matching every given restriction. `table = None` means
    /// the base table; with neither `column` nor `alias` the whole table goes.
    pub fn remove_column(&mut self, table: Option<&str>, column: Option<&str>, alias: Option<&str>) {
        let table = table.filter(|t| !t.is_empty());
        self.columns.retain(|c| {
            let same_table = c.table.as_deref() == table;
            let matches = same_table
                && column.is_none_or(|col| c.column == col)
                && alias.is_none_or(|a| c.alias == a);
            !matches
        });
    }

    pub fn remove_column_by_table(&mut self, table: &str) {
        self.remove_column(Some(table), None, None);
    }

    /// Removes every column with this name, whatever table it came from.
    pub fn remove_column_by_column(&mut self, column: &str) {
        self.columns.retain(|c| c.column != column);
    }

    pub fn remove_column_by_alias(&mut self, alias: &str) {
        self.columns.retain(|c| c.alias != alias);
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Whether `table` contributes a column (or, given `column`, that column
    /// or alias).
    pub fn has_table_column(&self, table: Option<&str>, column: Option<&str>) -> bool {
        let table = table.filter(|t| !t.is_empty());
        self.columns.iter().any(|c| {
            c.table.as_deref() == table
                && column.is_none_or(|col| c.column == col || c.alias == col)
        })
    }

    pub fn has_table_columns(&self, table: &str) -> bool {
        self.has_table_column(Some(table), None)
    }

    /// Column aliases in projection order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.alias.as_str())
    }

    fn main_table(&self) -> Result<&str> {
        if self.table.is_empty() {
            return Err(TabulaError::Query(
                "tried to get SQL from select before the table is set".into(),
            ));
        }
        Ok(self.alias.as_deref().unwrap_or(&self.table))
    }

    fn from_sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.table, alias),
            None => self.table.clone(),
        }
    }

    fn column_expr(&self, main: &str, column: &SelectColumn) -> String {
        if column.table_prefix {
            let table = column.table.as_deref().unwrap_or(main);
            format!("{table}.{}", column.column)
        } else {
            column.column.clone()
        }
    }

    /// `SELECT [DISTINCT] ... FROM table`
    pub fn to_sql(&self, dialect: Dialect) -> Result<String> {
        let main = self.main_table()?;
        let columns = if self.columns.is_empty() {
            format!("{main}.*")
        } else {
            self.columns
                .iter()
                .map(|c| {
                    let expr = self.column_expr(main, c);
                    if c.column == "*" {
                        expr
                    } else if c.column.contains("datetime") {
                        format!("{} AS {}", dialect.iso_datetime(&expr), c.alias)
                    } else {
                        format!("{expr} AS {}", c.alias)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        Ok(format!(
            "SELECT {}{columns} FROM {}",
            if self.distinct { "DISTINCT " } else { "" },
            self.from_sql()
        ))
    }

    /// `SELECT COUNT([DISTINCT] <first column>) FROM table`
    pub fn to_count_sql(&self) -> Result<String> {
        let main = self.main_table()?;
        let expr = match self.columns.first() {
            Some(c) if c.column != "*" => self.column_expr(main, c),
            _ => "*".to_string(),
        };
        let distinct = if self.distinct && expr != "*" { "DISTINCT " } else { "" };
        Ok(format!("SELECT COUNT({distinct}{expr}) FROM {}", self.from_sql()))
    }

    /// Builds a select from JSON of the form
    ///
    /// ```json
    /// {
    ///   "from": "table" | { "table": "table", "alias": "t" },
    ///   "column": [ "name", { "table": "t", "column": "c", "alias": "a", "table_prefix": true } ]
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Select> {
        let invalid = |what: &str| TabulaError::Query(format!("invalid {what} in select JSON"));
        let parsed: Json = serde_json::from_str(json).map_err(|e| TabulaError::Query(e.to_string()))?;
        let Json::Object(map) = parsed else {
            return Err(invalid("format"));
        };

        let mut select = Select::new();
        for (key, value) in map {
            match key.as_str() {
                "from" => match value {
                    Json::String(table) => {
                        select.from(table);
                    }
                    Json::Object(from) => {
                        let table = from
                            .get("table")
                            .and_then(Json::as_str)
                            .ok_or_else(|| invalid("from statement"))?;
                        match from.get("alias").and_then(Json::as_str) {
                            Some(alias) => select.from_alias(table, alias),
                            None => select.from(table),
                        };
                    }
                    _ => return Err(invalid("from statement")),
                },
                "column" => {
                    let columns = match value {
                        Json::Array(items) => items,
                        other => vec![other],
                    };
                    for column in columns {
                        match column {
                            Json::String(name) => {
                                select.add_column(&name, None)?;
                            }
                            Json::Object(entry) => {
                                let name = entry
                                    .get("column")
                                    .and_then(Json::as_str)
                                    .ok_or_else(|| invalid("column sub-statement"))?;
                                select.add_table_column(
                                    entry.get("table").and_then(Json::as_str),
                                    name,
                                    entry.get("alias").and_then(Json::as_str),
                                    entry.get("table_prefix")
                                        .and_then(Json::as_bool)
                                        .unwrap_or(true),
                                )?;
                            }
                            _ => return Err(invalid("column sub-statement")),
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(select)
    }
}
