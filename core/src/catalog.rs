//! The boundary between the mapper and the database driver.
//!
//! Everything the mapper knows about the schema, and every statement it runs,
//! goes through [`SchemaCatalog`]. Drivers implement it; the mapper never
//! touches a connection directly.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Dialect, Result, Row, Value};

/// Column metadata, statement execution and literal formatting for one
/// logical database connection.
///
/// Table names passed to the metadata methods are physical names, i.e. they
/// already carry [`get_prefix`](SchemaCatalog::get_prefix).
pub trait SchemaCatalog {
    /// Dialect the generated SQL must be written in.
    fn dialect(&self) -> Dialect;

    /// Table-name prefix applied uniformly to every mapped table.
    fn get_prefix(&self) -> &str {
        ""
    }

    /// A counter that changes whenever the schema changes. Caches keyed on
    /// schema facts are dropped when it moves.
    fn schema_version(&self) -> Result<u64> {
        Ok(0)
    }

    /// Every user table visible through this catalog.
    fn get_table_names(&self) -> Result<Vec<String>>;

    fn table_exists(&self, table: &str) -> Result<bool>;

    fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Column names in declaration order.
    fn get_column_names(&self, table: &str) -> Result<Vec<String>>;

    /// The column's default value, `None` when it has no default (or it is NULL).
    fn get_column_default(&self, table: &str, column: &str) -> Result<Option<Value>>;

    /// The column's declared type, e.g. `varchar(45)` or `enum('a','b')`.
    fn get_column_type(&self, table: &str, column: &str) -> Result<String>;

    /// Primary-key column names.
    fn get_primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// Column sets of every unique key, primary key excluded.
    fn get_unique_keys(&self, table: &str) -> Result<Vec<Vec<String>>>;

    /// Whether a column holds a time of day, judged by name alone.
    fn is_time_column(&self, column: &str) -> bool {
        column == "time" || column.ends_with("_time")
    }

    /// Whether a column holds a date and time, judged by name alone.
    fn is_datetime_column(&self, column: &str) -> bool {
        column == "datetime" || column.ends_with("_datetime")
    }

    /// First column of the first row, `None` when there are no rows.
    fn get_one(&self, sql: &str) -> Result<Option<Value>>;

    fn get_row(&self, sql: &str) -> Result<Option<Row>>;

    fn get_all(&self, sql: &str) -> Result<Vec<Row>>;

    /// First column of every row.
    fn get_col(&self, sql: &str) -> Result<Vec<Value>>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str) -> Result<u64>;

    /// Primary key generated by the most recent INSERT.
    fn insert_id(&self) -> Result<i64>;

    /// Renders a value as a SQL literal, quoting and escaping as needed.
    fn format_string(&self, value: &Value) -> String;
}

/// Standard SQL literal formatting shared by drivers: single quotes doubled,
/// blobs as hex literals.
pub fn format_sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) if r.is_finite() => {
            let mut s = r.to_string();
            if !s.contains(['.', 'e', 'E']) {
                s.push_str(".0");
            }
            s
        }
        Value::Real(_) => "NULL".to_string(),
        Value::Text(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for ch in s.chars() {
                if ch == '\'' {
                    out.push('\'');
                }
                out.push(ch);
            }
            out.push('\'');
            out
        }
        Value::Blob(bytes) => {
            let mut out = String::with_capacity(bytes.len() * 2 + 3);
            out.push_str("X'");
            for b in bytes.iter() {
                out.push_str(&format!("{b:02X}"));
            }
            out.push('\'');
            out
        }
    }
}

static ENUM_VALUE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"'((?:[^']|'')*)'").ok());

/// The member list of an `enum('a','b',...)` column type; empty for any
/// other type.
pub fn parse_enum_values(column_type: &str) -> Vec<String> {
    let trimmed = column_type.trim();
    let Some(body) = trimmed
        .get(..5)
        .filter(|head| head.eq_ignore_ascii_case("enum("))
        .and_then(|_| trimmed[5..].strip_suffix(')'))
    else {
        return Vec::new();
    };
    let Some(re) = ENUM_VALUE.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(body)
        .map(|c| c[1].replace("''", "'"))
        .collect()
}
