//! Schema facts that SQLite only exposes as SQL text: column defaults and
//! `CHECK (col IN (...))` enumerations.

use regex::Regex;
use tabula_core::Value;

/// Raw column info from `pragma_table_xinfo`
#[derive(Debug, Clone)]
pub struct RawColumnInfo {
    pub name: String,
    pub column_type: String,
    pub default_value: Option<String>,
    pub pk: i64,
    pub hidden: i64,
}

/// Raw index info from `pragma_index_list`
#[derive(Debug, Clone)]
pub struct RawIndexInfo {
    pub name: String,
    pub unique: bool,
    /// 'c' for CREATE INDEX, 'u' for UNIQUE, 'pk' for PRIMARY KEY
    pub origin: String,
    pub partial: bool,
}

/// SQL queries for SQLite introspection
pub mod queries {
    /// Every user table
    pub const TABLES_QUERY: &str = r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table'
          AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
        ORDER BY name
    "#;

    pub const TABLE_EXISTS_QUERY: &str =
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1";

    pub const TABLE_SQL_QUERY: &str =
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1";
}

/// Turns the SQL default text reported by `pragma_table_xinfo` into a value.
///
/// Literals become typed values, `NULL` becomes `None`, and anything else
/// (`CURRENT_TIMESTAMP`, function calls) is kept as its SQL text.
pub fn parse_default(raw: &str) -> Option<Value> {
    let mut text = raw.trim();
    while let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        text = inner.trim();
    }
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        return None;
    }
    if let Some(quoted) = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
    {
        return Some(Value::Text(quoted.replace("''", "'")));
    }
    if let Some(quoted) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Some(Value::Text(quoted.replace("\"\"", "\"")));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Some(Value::Real(f));
    }
    if text.eq_ignore_ascii_case("true") {
        return Some(Value::Integer(1));
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(Value::Integer(0));
    }
    if ["current_timestamp", "current_date", "current_time"]
        .iter()
        .any(|k| text.eq_ignore_ascii_case(k))
    {
        return Some(Value::Text(text.to_ascii_uppercase()));
    }
    Some(Value::Text(text.to_string()))
}

/// Finds `CHECK (column IN ('a', 'b'))` in a table's DDL and renders it as
/// `enum('a','b')`.
pub fn check_enum_type(table_sql: &str, column: &str) -> Option<String> {
    let pattern = format!(
        r#"(?is)CHECK\s*\(\s*["`\[]?{}["`\]]?\s+IN\s*\(([^)]*)\)\s*\)"#,
        regex::escape(column)
    );
    let re = Regex::new(&pattern).ok()?;
    let list = re.captures(table_sql)?.get(1)?.as_str();
    let item = Regex::new(r"'(?:[^']|'')*'").ok()?;
    let members: Vec<&str> = item.find_iter(list).map(|m| m.as_str()).collect();
    if members.is_empty() {
        return None;
    }
    Some(format!("enum({})", members.join(",")))
}
