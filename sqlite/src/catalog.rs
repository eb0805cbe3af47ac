//! [`SchemaCatalog`] over a rusqlite connection.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Statement};
use tabula_core::{
    Dialect, Result, Row, SchemaCatalog, TabulaError, Value, format_sql_literal,
    tabula_trace_query,
};

use crate::convert::{classify, value_from_ref};
use crate::introspect::{RawColumnInfo, RawIndexInfo, check_enum_type, parse_default, queries};
use crate::pragma::Pragma;

/// A schema catalog backed by one SQLite connection.
///
/// ```no_run
/// use tabula_sqlite::SqliteCatalog;
///
/// let catalog = SqliteCatalog::open_in_memory()?.with_prefix("app_");
/// catalog.connection().execute_batch("CREATE TABLE app_user (id INTEGER PRIMARY KEY)")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
    prefix: String,
}

impl SqliteCatalog {
    /// Wraps an existing connection as is.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            prefix: String::new(),
        }
    }

    /// Opens a private in-memory database with foreign keys enforced.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(classify)?;
        Self::with_foreign_keys(conn)
    }

    /// Opens (or creates) a database file with foreign keys enforced.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(classify)?;
        Self::with_foreign_keys(conn)
    }

    fn with_foreign_keys(conn: Connection) -> Result<Self> {
        conn.execute_batch(&Pragma::ForeignKeys(true).to_string())
            .map_err(classify)?;
        Ok(Self::new(conn))
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        tabula_trace_query!(sql);
        self.conn.prepare(sql).map_err(classify)
    }

    /// Every column of `table`, in declaration order. Empty for an unknown table.
    pub fn columns(&self, table: &str) -> Result<Vec<RawColumnInfo>> {
        let mut stmt = self.prepare(&Pragma::TableXInfo(table).to_string())?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawColumnInfo {
                    name: row.get(1)?,
                    column_type: row.get(2)?,
                    default_value: row.get(4)?,
                    pk: row.get(5)?,
                    hidden: row.get(6)?,
                })
            })
            .map_err(classify)?;
        let mut columns = Vec::new();
        for row in rows {
            let column = row.map_err(classify)?;
            // hidden = 1 marks virtual-table internals
            if column.hidden != 1 {
                columns.push(column);
            }
        }
        Ok(columns)
    }

    fn column(&self, table: &str, column: &str) -> Result<RawColumnInfo> {
        self.columns(table)?
            .into_iter()
            .find(|c| c.name == column)
            .ok_or_else(|| TabulaError::argument("column", format!("{table}.{column}")))
    }

    fn indexes(&self, table: &str) -> Result<Vec<RawIndexInfo>> {
        let mut stmt = self.prepare(&Pragma::IndexList(table).to_string())?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RawIndexInfo {
                    name: row.get(1)?,
                    unique: row.get::<_, i64>(2)? != 0,
                    origin: row.get(3)?,
                    partial: row.get::<_, i64>(4)? != 0,
                })
            })
            .map_err(classify)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(classify)
    }

    fn index_columns(&self, index: &str) -> Result<Vec<String>> {
        let mut stmt = self.prepare(&Pragma::IndexInfo(index).to_string())?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(2)?)))
            .map_err(classify)?;
        let mut columns = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(classify)?;
        columns.sort_by_key(|(seqno, _)| *seqno);
        Ok(columns.into_iter().filter_map(|(_, name)| name).collect())
    }

    fn table_sql(&self, table: &str) -> Result<Option<String>> {
        let mut stmt = self.prepare(queries::TABLE_SQL_QUERY)?;
        stmt.query_row([table], |row| row.get::<_, Option<String>>(0))
            .optional()
            .map(Option::flatten)
            .map_err(classify)
    }

    fn query_rows(&self, sql: &str, limit: Option<usize>) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let mut rows = stmt.query([]).map_err(classify)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut record = Row::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).map_err(classify)?;
                record.insert(name.as_str(), value_from_ref(value));
            }
            out.push(record);
            if limit.is_some_and(|l| out.len() >= l) {
                break;
            }
        }
        Ok(out)
    }
}

impl SchemaCatalog for SqliteCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn get_prefix(&self) -> &str {
        &self.prefix
    }

    fn schema_version(&self) -> Result<u64> {
        let version: i64 = self
            .conn
            .query_row(&Pragma::SchemaVersion.to_string(), [], |row| row.get(0))
            .map_err(classify)?;
        Ok(version.max(0) as u64)
    }

    fn get_table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.prepare(queries::TABLES_QUERY)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(classify)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(classify)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let mut stmt = self.prepare(queries::TABLE_EXISTS_QUERY)?;
        stmt.exists([table]).map_err(classify)
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.columns(table)?.iter().any(|c| c.name == column))
    }

    fn get_column_names(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.columns(table)?.into_iter().map(|c| c.name).collect())
    }

    fn get_column_default(&self, table: &str, column: &str) -> Result<Option<Value>> {
        Ok(self
            .column(table, column)?
            .default_value
            .as_deref()
            .and_then(parse_default))
    }

    fn get_column_type(&self, table: &str, column: &str) -> Result<String> {
        let info = self.column(table, column)?;
        if let Some(sql) = self.table_sql(table)?
            && let Some(enum_type) = check_enum_type(&sql, column)
        {
            return Ok(enum_type);
        }
        Ok(info.column_type.to_ascii_lowercase())
    }

    fn get_primary_key(&self, table: &str) -> Result<Vec<String>> {
        let mut key: Vec<RawColumnInfo> = self
            .columns(table)?
            .into_iter()
            .filter(|c| c.pk > 0)
            .collect();
        key.sort_by_key(|c| c.pk);
        Ok(key.into_iter().map(|c| c.name).collect())
    }

    fn get_unique_keys(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let mut keys = Vec::new();
        for index in self.indexes(table)? {
            if !index.unique || index.partial || index.origin == "pk" {
                continue;
            }
            let columns = self.index_columns(&index.name)?;
            if !columns.is_empty() {
                keys.push(columns);
            }
        }
        Ok(keys)
    }

    fn get_one(&self, sql: &str) -> Result<Option<Value>> {
        Ok(self
            .query_rows(sql, Some(1))?
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next()))
    }

    fn get_row(&self, sql: &str) -> Result<Option<Row>> {
        Ok(self.query_rows(sql, Some(1))?.into_iter().next())
    }

    fn get_all(&self, sql: &str) -> Result<Vec<Row>> {
        self.query_rows(sql, None)
    }

    fn get_col(&self, sql: &str) -> Result<Vec<Value>> {
        Ok(self
            .query_rows(sql, None)?
            .into_iter()
            .filter_map(|row| row.into_values().into_iter().next())
            .collect())
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        tabula_trace_query!(sql);
        let changed = self.conn.execute(sql, []).map_err(classify)?;
        Ok(changed as u64)
    }

    fn insert_id(&self) -> Result<i64> {
        Ok(self.conn.last_insert_rowid())
    }

    fn format_string(&self, value: &Value) -> String {
        format_sql_literal(value)
    }
}
