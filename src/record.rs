//! Active records: one row of an entity's primary table plus its extending
//! rows, read and written as a unit.

use core::fmt;

use tabula_core::datetime::{self, TemporalKind};
use tabula_core::query::{DeleteStatement, InsertStatement, UpdateStatement};
use tabula_core::{
    Modifier, Operator, Result, Row, SchemaCatalog, TabulaError, Value, tabula_trace_query,
    tabula_trace_write,
};

use crate::db::Tabula;
use crate::registry::{ColumnSchema, EntitySchema, TableSchema};

/// A record of one entity.
///
/// Values are held per table in column order; attribute names map onto them
/// through the entity's field map.
pub struct Record<'db, C: SchemaCatalog> {
    db: &'db Tabula<C>,
    schema: &'db EntitySchema,
    values: Vec<Vec<Value>>,
    read_only: bool,
}

impl<C: SchemaCatalog> Clone for Record<'_, C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db,
            schema: self.schema,
            values: self.values.clone(),
            read_only: self.read_only,
        }
    }
}

impl<C: SchemaCatalog> fmt::Debug for Record<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("entity", &self.schema.name)
            .field("id", &self.id())
            .field("values", &self.values)
            .field("read_only", &self.read_only)
            .finish()
    }
}

fn default_value(column: &ColumnSchema) -> Value {
    let is_clock = |v: &Value| {
        v.as_str()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("CURRENT_TIMESTAMP"))
    };
    if column.name == "start_datetime"
        || (column.name == "datetime" && column.default.as_ref().is_some_and(is_clock))
    {
        return datetime::now(TemporalKind::DateTime);
    }
    match &column.default {
        Some(default) => {
            datetime::resolve_clock_default(default, column.temporal).unwrap_or_else(|| default.clone())
        }
        None => Value::Null,
    }
}

impl<'db, C: SchemaCatalog> Record<'db, C> {
    pub(crate) fn new(db: &'db Tabula<C>, schema: &'db EntitySchema) -> Self {
        let values = schema
            .tables
            .iter()
            .map(|table| {
                table
                    .columns
                    .iter()
                    .map(|column| {
                        if table.is_extending() && column.name == table.key {
                            Value::Null
                        } else {
                            default_value(column)
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            db,
            schema,
            values,
            read_only: schema.read_only,
        }
    }

    pub(crate) fn db(&self) -> &'db Tabula<C> {
        self.db
    }

    pub fn schema(&self) -> &'db EntitySchema {
        self.schema
    }

    pub fn entity_name(&self) -> &'db str {
        &self.schema.name
    }

    /// Physical name of the primary table.
    pub fn table_name(&self) -> &'db str {
        self.schema.table_name()
    }

    fn key_slot(table: &TableSchema) -> Option<usize> {
        table.column_index(&table.key)
    }

    /// The primary key, `None` until the record is saved or loaded.
    pub fn id(&self) -> Option<i64> {
        let slot = Self::key_slot(self.schema.primary())?;
        self.values[0][slot].as_i64()
    }

    fn set_id(&mut self, id: Option<i64>) {
        let id = id.map_or(Value::Null, Value::Integer);
        for (table, values) in self.schema.tables.iter().zip(self.values.iter_mut()) {
            if let Some(slot) = Self::key_slot(table) {
                values[slot] = id.clone();
            }
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// An attribute's value: a primary column, or `<suffix>_<column>` of an
    /// extending table.
    pub fn get(&self, name: &str) -> Result<&Value> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| TabulaError::argument("column_name", name))?;
        Ok(&self.values[field.table][field.column])
    }

    /// Sets an attribute; nothing is written until [`save`](Self::save).
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| TabulaError::argument("column_name", name))?;
        if field.table == 0 && self.schema.column(field).name == self.schema.primary_key {
            return Err(TabulaError::argument(name, "the primary key cannot be set"));
        }
        self.values[field.table][field.column] = value.into();
        Ok(self)
    }

    /// A primary-table column by its own name, bypassing attribute names.
    pub(crate) fn primary_value(&self, column: &str) -> Option<&Value> {
        let slot = self.schema.primary().column_index(column)?;
        self.values[0].get(slot)
    }

    /// Primary table columns and their values.
    pub fn column_values(&self) -> Row {
        let table = self.schema.primary();
        let mut row = Row::with_capacity(table.columns.len());
        for (column, value) in table.columns.iter().zip(&self.values[0]) {
            row.insert(column.name.as_str(), value.clone());
        }
        row
    }

    /// Every attribute, extending ones included.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        for name in self.schema.field_names() {
            if let Some(field) = self.schema.field(name) {
                row.insert(name, self.values[field.table][field.column].clone());
            }
        }
        row
    }

    pub(crate) fn load_id(&mut self, id: i64) -> Result<()> {
        self.set_id(Some(id));
        self.load()
    }

    /// Re-reads every table row. Does nothing for an unsaved record.
    ///
    /// A missing primary row is an error; a missing extending row keeps its
    /// defaults.
    pub fn load(&mut self) -> Result<()> {
        let Some(id) = self.id() else {
            return Ok(());
        };
        let catalog = self.db.catalog();
        for (table, values) in self.schema.tables.iter().zip(self.values.iter_mut()) {
            let sql = format!("SELECT * FROM {} WHERE {} = {id}", table.name, table.key);
            tabula_trace_query!(&sql);
            let Some(row) = catalog.get_row(&sql)? else {
                if !table.is_extending() {
                    return Err(TabulaError::RecordNotFound {
                        table: table.name.clone(),
                        key: table.key.clone(),
                        id,
                    });
                }
                continue;
            };
            for (name, value) in row.iter() {
                let Some(slot) = table.column_index(name) else {
                    continue;
                };
                values[slot] = match table.columns[slot].temporal {
                    Some(kind) => datetime::from_server(value.clone(), kind),
                    None => value.clone(),
                };
            }
        }
        Ok(())
    }

    fn check_interval(&self, table: &TableSchema, values: &[Value]) -> Result<()> {
        for (start, end, kind) in [
            ("start_time", "end_time", TemporalKind::Time),
            ("start_datetime", "end_datetime", TemporalKind::DateTime),
        ] {
            let (Some(s), Some(e)) = (table.column_index(start), table.column_index(end)) else {
                continue;
            };
            if table.columns[e].default.is_none() {
                continue;
            }
            if datetime::is_after(end, &values[s], &values[e], kind)? == Some(false) {
                return Err(TabulaError::Validation(format!(
                    "tried to set {end} which is not after {start}"
                )));
            }
            return Ok(());
        }
        Ok(())
    }

    /// Columns of one table that `save` writes, converted to storage form.
    fn write_set(&self, index: usize) -> Result<Vec<(&'db str, Value)>> {
        let schema: &'db EntitySchema = self.schema;
        let table = &schema.tables[index];
        let config = self.db.config();
        let mut set = Vec::with_capacity(table.columns.len());
        for (column, value) in table.columns.iter().zip(&self.values[index]) {
            if column.name == table.key || config.is_timestamp_column(&column.name) {
                continue;
            }
            let value = match column.temporal {
                Some(kind) => datetime::to_server(&column.name, value, kind)?,
                None => value.clone(),
            };
            set.push((column.name.as_str(), value));
        }
        Ok(set)
    }

    /// Inserts a new record or updates an existing one; extending rows are
    /// upserted.
    pub fn save(&mut self) -> Result<()> {
        if self.read_only {
            tracing::warn!(table = %self.table_name(), "Tried to save read-only record.");
            return Ok(());
        }
        for (table, values) in self.schema.tables.iter().zip(&self.values) {
            self.check_interval(table, values)?;
        }
        let db = self.db;
        let was_new = self.id().is_none();
        let result = db.atomic(|| self.write_tables());
        // a rolled back insert leaves no row behind
        if result.is_err() && was_new && db.config().atomic_saves {
            self.set_id(None);
        }
        result
    }

    fn write_tables(&mut self) -> Result<()> {
        let catalog = self.db.catalog();
        let schema = self.schema;
        let mut id = self.id();

        for (index, table) in schema.tables.iter().enumerate() {
            let set = self.write_set(index)?;
            if !table.is_extending() {
                match id {
                    None => {
                        let (columns, values): (Vec<&str>, Vec<Value>) = set.into_iter().unzip();
                        let mut insert = InsertStatement::new(&table.name).columns(columns);
                        if !values.is_empty() {
                            insert = insert.row(values);
                        }
                        tabula_trace_write!("insert", table.name);
                        self.db.execute(&insert.to_sql(catalog)?)?;
                        let new_id = catalog.insert_id()?;
                        self.set_id(Some(new_id));
                        id = Some(new_id);
                    }
                    Some(id) => {
                        let update = set
                            .into_iter()
                            .fold(UpdateStatement::new(&table.name, &table.key, id), |u, (c, v)| {
                                u.set(c, v)
                            });
                        if let Some(sql) = update.to_sql(catalog) {
                            tabula_trace_write!("update", table.name);
                            self.db.execute(&sql)?;
                        }
                    }
                }
                continue;
            }

            let Some(id) = id else {
                return Err(TabulaError::Schema(format!(
                    "no id to key extending table {}",
                    table.name
                )));
            };
            let mut columns = vec![table.key.as_str()];
            let mut values = vec![Value::Integer(id)];
            for (column, value) in set {
                columns.push(column);
                values.push(value);
            }
            let upsert = InsertStatement::new(&table.name)
                .columns(columns)
                .row(values)
                .upsert_on(&table.key);
            tabula_trace_write!("upsert", table.name);
            self.db.execute(&upsert.to_sql(catalog)?)?;
        }
        Ok(())
    }

    /// Deletes every row of the record, extending rows first. The record
    /// keeps its values but loses its id.
    pub fn delete(&mut self) -> Result<()> {
        if self.read_only {
            tracing::warn!(table = %self.table_name(), "Tried to delete read-only record.");
            return Ok(());
        }
        let Some(id) = self.id() else {
            tracing::warn!(table = %self.table_name(), "Tried to delete record with no id.");
            return Ok(());
        };
        let db = self.db;
        let catalog = db.catalog();
        db.atomic(|| {
            for table in self.schema.tables.iter().rev() {
                let mut filter = Modifier::new();
                filter.r#where(table.key.as_str(), Operator::Eq, id);
                let sql = DeleteStatement::new(&table.name, filter).to_sql(catalog)?;
                tabula_trace_write!("delete", table.name);
                db.execute(&sql)?;
            }
            Ok(())
        })?;
        self.set_id(None);
        Ok(())
    }
}
