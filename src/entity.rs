//! Entity-level queries: selects over an entity's primary table, unique-key
//! lookups and column metadata.

use tabula_core::query::{self, Select};
use tabula_core::relationship::foreign_key;
use tabula_core::{
    Modifier, Operator, Relationship, Result, Row, SchemaCatalog, TabulaError, Value,
    parse_enum_values, tabula_trace_query,
};

use crate::db::Tabula;
use crate::record::Record;
use crate::registry::EntitySchema;

/// Shape of a select's result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Hydrated records
    #[default]
    Object,
    /// Column maps
    Array,
    /// Primary keys
    Id,
}

/// Result of [`EntityType::select`].
#[derive(Debug)]
pub enum Selection<'db, C: SchemaCatalog> {
    Records(Vec<Record<'db, C>>),
    Rows(Vec<Row>),
    Ids(Vec<i64>),
    Count(u64),
}

impl<'db, C: SchemaCatalog> Selection<'db, C> {
    pub fn into_records(self) -> Vec<Record<'db, C>> {
        match self {
            Selection::Records(records) => records,
            _ => Vec::new(),
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Selection::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn into_ids(self) -> Vec<i64> {
        match self {
            Selection::Ids(ids) => ids,
            _ => Vec::new(),
        }
    }

    /// The count, or the number of items selected.
    pub fn count(&self) -> u64 {
        match self {
            Selection::Records(records) => records.len() as u64,
            Selection::Rows(rows) => rows.len() as u64,
            Selection::Ids(ids) => ids.len() as u64,
            Selection::Count(count) => *count,
        }
    }
}

/// Handle on one registered entity.
pub struct EntityType<'db, C: SchemaCatalog> {
    db: &'db Tabula<C>,
    schema: &'db EntitySchema,
}

impl<C: SchemaCatalog> Clone for EntityType<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: SchemaCatalog> Copy for EntityType<'_, C> {}

impl<C: SchemaCatalog> core::fmt::Debug for EntityType<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.schema.name)
            .finish()
    }
}

impl<'db, C: SchemaCatalog> EntityType<'db, C> {
    pub(crate) fn new(db: &'db Tabula<C>, schema: &'db EntitySchema) -> Self {
        Self { db, schema }
    }

    pub fn name(&self) -> &'db str {
        &self.schema.name
    }

    /// Physical name of the primary table.
    pub fn table_name(&self) -> &'db str {
        self.schema.table_name()
    }

    pub fn primary_key(&self) -> &'db str {
        &self.schema.primary_key
    }

    pub fn schema(&self) -> &'db EntitySchema {
        self.schema
    }

    /// Joins every table the modifier filters or sorts on, when a foreign
    /// key links it to this entity. Each table is joined at most once.
    fn auto_join(&self, modifier: &mut Modifier) -> Result<()> {
        let catalog = self.db.catalog();
        let prefix = catalog.get_prefix();
        let this = self.table_name();
        let pk = self.primary_key();
        for table in modifier.referenced_tables() {
            if table == this || modifier.has_join(&table) {
                continue;
            }
            let name = table.strip_prefix(prefix).unwrap_or(&table);
            let fk = foreign_key(name);
            if self.schema.primary().has_column(&fk) {
                let other_pk = self
                    .db
                    .registry()
                    .get(name)
                    .map_or(self.db.config().primary_key.as_str(), |e| e.primary_key.as_str());
                modifier.join(
                    table.as_str(),
                    format!("{this}.{fk}"),
                    format!("{table}.{other_pk}"),
                );
            } else {
                let back = foreign_key(self.name());
                if catalog.column_exists(&table, &back)? {
                    modifier.join(
                        table.as_str(),
                        format!("{table}.{back}"),
                        format!("{this}.{pk}"),
                    );
                }
            }
        }
        Ok(())
    }

    /// The projection of this entity's primary table for `format`, selected
    /// `FROM from`.
    pub(crate) fn projection(
        &self,
        from: &str,
        count: bool,
        distinct: bool,
        format: Format,
    ) -> Result<Select> {
        let table = Some(self.table_name());
        let mut select = Select::new();
        select.from(from).distinct(distinct);
        if format == Format::Array && !count {
            let config = self.db.config();
            for column in &self.schema.primary().columns {
                if !config.is_timestamp_column(&column.name) {
                    select.add_table_column(table, &column.name, None, true)?;
                }
            }
        } else {
            select.add_table_column(table, self.primary_key(), None, true)?;
        }
        Ok(select)
    }

    /// Runs a projection built by [`projection`](Self::projection). Unsorted
    /// lists are ordered by primary key.
    pub(crate) fn fetch(
        &self,
        select: &Select,
        mut modifier: Modifier,
        count: bool,
        format: Format,
    ) -> Result<Selection<'db, C>> {
        let catalog = self.db.catalog();
        if count {
            let sql = query::to_count_sql(select, &modifier, catalog)?;
            tabula_trace_query!(&sql);
            let count = catalog.get_one(&sql)?.and_then(|v| v.as_i64()).unwrap_or(0);
            return Ok(Selection::Count(count.max(0) as u64));
        }
        if !modifier.has_order() {
            modifier.order(format!("{}.{}", self.table_name(), self.primary_key()));
        }
        let sql = query::to_sql(select, &modifier, catalog)?;
        tabula_trace_query!(&sql);
        match format {
            Format::Array => Ok(Selection::Rows(catalog.get_all(&sql)?)),
            Format::Id => Ok(Selection::Ids(ids(catalog.get_col(&sql)?))),
            Format::Object => {
                let mut records = Vec::new();
                for id in ids(catalog.get_col(&sql)?) {
                    let mut record = Record::new(self.db, self.schema);
                    record.load_id(id)?;
                    records.push(record);
                }
                Ok(Selection::Records(records))
            }
        }
    }

    /// Selects from this entity's table.
    ///
    /// Tables named in the modifier's filters or ordering are joined
    /// automatically when a foreign key links them to this entity.
    pub fn select(
        &self,
        modifier: Option<Modifier>,
        count: bool,
        distinct: bool,
        format: Format,
    ) -> Result<Selection<'db, C>> {
        let mut modifier = modifier.unwrap_or_default();
        self.auto_join(&mut modifier)?;
        let select = self.projection(self.table_name(), count, distinct, format)?;
        self.fetch(&select, modifier, count, format)
    }

    fn distinct(&self) -> bool {
        self.db.config().distinct
    }

    pub fn records(&self, modifier: Option<Modifier>) -> Result<Vec<Record<'db, C>>> {
        Ok(self
            .select(modifier, false, self.distinct(), Format::Object)?
            .into_records())
    }

    pub fn array_select(&self, modifier: Option<Modifier>) -> Result<Vec<Row>> {
        Ok(self
            .select(modifier, false, self.distinct(), Format::Array)?
            .into_rows())
    }

    pub fn id_select(&self, modifier: Option<Modifier>) -> Result<Vec<i64>> {
        Ok(self
            .select(modifier, false, self.distinct(), Format::Id)?
            .into_ids())
    }

    pub fn count(&self, modifier: Option<Modifier>) -> Result<u64> {
        Ok(self
            .select(modifier, true, self.distinct(), Format::Id)?
            .count())
    }

    /// Looks a record up by the complete column set of one unique key.
    ///
    /// Columns that do not form a unique key are logged and yield `None`.
    pub fn get_unique_record(
        &self,
        columns: &[&str],
        values: &[Value],
    ) -> Result<Option<Record<'db, C>>> {
        if columns.is_empty() || columns.len() != values.len() {
            return Err(TabulaError::argument(
                "columns",
                format!("{} columns for {} values", columns.len(), values.len()),
            ));
        }
        let catalog = self.db.catalog();
        let mut pairs: Vec<(&str, &Value)> = columns.iter().copied().zip(values).collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let found = catalog
            .get_unique_keys(self.table_name())?
            .into_iter()
            .any(|mut key| {
                key.sort();
                key.len() == pairs.len() && key.iter().zip(&pairs).all(|(k, (c, _))| k.as_str() == *c)
            });
        if !found {
            tracing::error!(
                table = %self.table_name(),
                columns = ?columns,
                "Trying to get unique record using invalid columns."
            );
            return Ok(None);
        }

        let mut modifier = Modifier::new();
        for (column, value) in pairs {
            modifier.r#where(column, Operator::Eq, value.clone());
        }
        let mut select = Select::new();
        select.from(self.table_name());
        select.add_column(self.primary_key(), None)?;
        let sql = query::to_sql(&select, &modifier, catalog)?;
        tabula_trace_query!(&sql);
        match catalog.get_one(&sql)?.and_then(|v| v.as_i64()) {
            Some(id) => {
                let mut record = Record::new(self.db, self.schema);
                record.load_id(id)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Members of an `enum(...)` column; empty for any other type.
    pub fn get_enum_values(&self, column: &str) -> Result<Vec<String>> {
        let column_type = self
            .db
            .catalog()
            .get_column_type(self.table_name(), column)?;
        Ok(parse_enum_values(&column_type))
    }

    /// Every distinct value of a primary-table column, sorted.
    pub fn get_distinct_values(&self, column: &str) -> Result<Vec<Value>> {
        if !self.column_exists(column, false) {
            return Err(TabulaError::argument("column_name", column));
        }
        let table = self.table_name();
        let sql = format!("SELECT DISTINCT {column} FROM {table} ORDER BY {column}");
        tabula_trace_query!(&sql);
        self.db.catalog().get_col(&sql)
    }

    /// Whether the primary table has the column; with `include_extending`
    /// also accepts `<suffix>_<column>` attributes of extending tables.
    pub fn column_exists(&self, column: &str, include_extending: bool) -> bool {
        self.schema.primary().has_column(column)
            || (include_extending && self.schema.field(column).is_some_and(|f| f.table > 0))
    }

    pub fn relationship(&self, other: &str) -> Result<Relationship> {
        self.db.relationship(self.name(), other)
    }

    pub fn joining_table_name(&self, other: &str) -> Result<Option<String>> {
        self.db.joining_table(self.name(), other)
    }
}

fn ids(values: Vec<Value>) -> Vec<i64> {
    values.iter().filter_map(Value::as_i64).collect()
}
