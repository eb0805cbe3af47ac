//! Records related to a record: the parent it references, its children in a
//! one-to-many pair and its partners in a many-to-many pair.

use tabula_core::query::{DeleteStatement, InsertStatement};
use tabula_core::relationship::{foreign_key, is_joining_table_name};
use tabula_core::{
    Modifier, Operator, Relationship, Result, Row, SchemaCatalog, TabulaError, Value,
    tabula_trace_write,
};

use crate::entity::{EntityType, Format, Selection};
use crate::record::Record;

/// Filter and shape of a relation query.
#[derive(Clone, Debug, Default)]
pub struct RelationQuery {
    pub modifier: Modifier,
    /// Select the records NOT related instead
    pub inverted: bool,
    /// Overrides the configured DISTINCT default
    pub distinct: Option<bool>,
}

impl RelationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    #[inline]
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    #[inline]
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = Some(distinct);
        self
    }
}

fn empty<'db, C: SchemaCatalog>(count: bool, format: Format) -> Selection<'db, C> {
    match (count, format) {
        (true, _) => Selection::Count(0),
        (false, Format::Object) => Selection::Records(Vec::new()),
        (false, Format::Array) => Selection::Rows(Vec::new()),
        (false, Format::Id) => Selection::Ids(Vec::new()),
    }
}

impl<'db, C: SchemaCatalog> Record<'db, C> {
    /// The record this one references through `<subject>_id`.
    ///
    /// `None` when unsaved, when there is no such column or when it is null.
    pub fn parent(&self, subject: &str) -> Result<Option<Record<'db, C>>> {
        if self.id().is_none() {
            tracing::warn!(table = %self.table_name(), "Tried to query record with no id.");
            return Ok(None);
        }
        let fk = foreign_key(subject);
        let Some(value) = self.primary_value(&fk) else {
            tracing::warn!(
                table = %self.table_name(),
                subject,
                "Tried to get invalid record type."
            );
            return Ok(None);
        };
        match value.as_i64() {
            Some(id) => self.db().load(subject, id).map(Some),
            None => Ok(None),
        }
    }

    pub fn list(&self, subject: &str, query: RelationQuery) -> Result<Vec<Record<'db, C>>> {
        Ok(self
            .related(subject, query, false, Format::Object)?
            .into_records())
    }

    /// Related rows as column maps, timestamp columns left out.
    pub fn arraylist(&self, subject: &str, query: RelationQuery) -> Result<Vec<Row>> {
        Ok(self
            .related(subject, query, false, Format::Array)?
            .into_rows())
    }

    pub fn idlist(&self, subject: &str, query: RelationQuery) -> Result<Vec<i64>> {
        Ok(self.related(subject, query, false, Format::Id)?.into_ids())
    }

    pub fn count_related(&self, subject: &str, query: RelationQuery) -> Result<u64> {
        Ok(self.related(subject, query, true, Format::Id)?.count())
    }

    /// Selects the `subject` records related to this one (or, inverted, the
    /// ones that are not).
    pub fn related(
        &self,
        subject: &str,
        query: RelationQuery,
        count: bool,
        format: Format,
    ) -> Result<Selection<'db, C>> {
        let Some(id) = self.id() else {
            tracing::warn!(table = %self.table_name(), "Tried to query record with no id.");
            return Ok(empty(count, format));
        };
        let db = self.db();
        let resolved = db.resolve(self.entity_name(), subject)?;
        let distinct = query.distinct.unwrap_or(db.config().distinct);
        match resolved.kind {
            Relationship::None | Relationship::OneToOne => {
                tracing::error!(
                    table = %self.table_name(),
                    subject,
                    relationship = %resolved.kind,
                    "Tried to get a list without a one-to-many or many-to-many relationship."
                );
                Ok(empty(count, format))
            }
            Relationship::OneToMany => {
                let child = db.entity(subject)?;
                let column = format!("{}.{}", child.table_name(), foreign_key(self.entity_name()));
                let mut modifier = Modifier::new();
                if query.inverted {
                    modifier.where_group(false, |group| {
                        group
                            .and(column.as_str(), Operator::Eq, Value::Null)
                            .or(column.as_str(), Operator::NotEq, id);
                    });
                } else {
                    modifier.r#where(column, Operator::Eq, id);
                }
                modifier.merge(query.modifier);
                child.select(Some(modifier), count, distinct, format)
            }
            Relationship::ManyToMany => {
                let Some(joining) = resolved.joining_table else {
                    return Err(TabulaError::Schema(format!(
                        "no joining table between {} and {subject}",
                        self.entity_name()
                    )));
                };
                let other = db.entity(subject)?;
                self.many_to_many(other, &joining, id, query, count, distinct, format)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn many_to_many(
        &self,
        other: EntityType<'db, C>,
        joining: &str,
        id: i64,
        query: RelationQuery,
        count: bool,
        distinct: bool,
        format: Format,
    ) -> Result<Selection<'db, C>> {
        let catalog = self.db().catalog();
        let this = self.table_name();
        let this_pk = format!("{this}.{}", self.schema().primary_key);
        let other_table = other.table_name();
        let other_pk = format!("{other_table}.{}", other.primary_key());
        let joining_this = format!("{joining}.{}", foreign_key(self.entity_name()));
        let joining_other = format!("{joining}.{}", foreign_key(other.name()));

        let mut modifier = Modifier::new();
        let from = if query.inverted {
            let sub = format!(
                "SELECT {joining_other} FROM {this} JOIN {joining} ON {this_pk} = {joining_this} \
                 WHERE {this_pk} = {id}"
            );
            modifier.where_subquery(other_pk.as_str(), Operator::NotIn, &sub);
            other_table
        } else {
            modifier
                .join(joining, this_pk.as_str(), joining_this.as_str())
                .join(other_table, joining_other.as_str(), other_pk.as_str())
                .r#where(this_pk.as_str(), Operator::Eq, id);
            this
        };

        // tables the caller filters or sorts on, joined through whichever of
        // the three tables holds their foreign key
        let prefix = catalog.get_prefix();
        for table in query.modifier.referenced_tables() {
            if [this, joining, other_table].contains(&table.as_str())
                || is_joining_table_name(&table)
                || modifier.has_join(&table)
                || query.modifier.has_join(&table)
            {
                continue;
            }
            let name = table.strip_prefix(prefix).unwrap_or(&table);
            let fk = foreign_key(name);
            let pk = self
                .db()
                .registry()
                .get(name)
                .map_or(self.db().config().primary_key.as_str(), |e| e.primary_key.as_str());
            let mut holders = vec![other_table];
            if !query.inverted {
                holders.extend([joining, this]);
            }
            for holder in holders {
                if catalog.column_exists(holder, &fk)? {
                    modifier.join(
                        table.as_str(),
                        format!("{holder}.{fk}"),
                        format!("{table}.{pk}"),
                    );
                    break;
                }
            }
        }
        modifier.merge(query.modifier);

        let select = other.projection(from, count, distinct, format)?;
        other.fetch(&select, modifier, count, format)
    }

    /// Links this record to each `subject` id through the joining table.
    ///
    /// An empty `ids` slice only logs a warning and returns `Ok`; the
    /// `add_<subject>` accessor of [`Record::call`] rejects it as an argument
    /// error instead.
    pub fn add(&self, subject: &str, ids: &[i64]) -> Result<()> {
        if self.is_read_only() {
            tracing::warn!(
                table = %self.table_name(),
                subject,
                "Tried to add records to read-only record."
            );
            return Ok(());
        }
        let Some(id) = self.id() else {
            tracing::warn!(table = %self.table_name(), "Tried to query record with no id.");
            return Ok(());
        };
        if ids.is_empty() {
            tracing::warn!(table = %self.table_name(), subject, "Tried to add no records.");
            return Ok(());
        }
        let db = self.db();
        let resolved = db.resolve(self.entity_name(), subject)?;
        let (Relationship::ManyToMany, Some(joining)) = (resolved.kind, resolved.joining_table)
        else {
            tracing::error!(
                table = %self.table_name(),
                subject,
                "Tried to add records without a many-to-many relationship."
            );
            return Ok(());
        };

        let mut insert = InsertStatement::new(joining.as_str())
            .columns([foreign_key(self.entity_name()), foreign_key(subject)]);
        for &other in ids {
            insert = insert.row(vec![Value::Integer(id), Value::Integer(other)]);
        }
        let sql = insert.to_sql(db.catalog())?;
        tabula_trace_write!("insert", joining);
        db.execute(&sql)?;
        Ok(())
    }

    /// Unlinks one `subject` record: deletes the child of a one-to-many
    /// pair, or the joining row of a many-to-many pair.
    pub fn remove(&self, subject: &str, other: i64) -> Result<()> {
        if other <= 0 {
            return Err(TabulaError::argument("id", other));
        }
        if self.is_read_only() {
            tracing::warn!(
                table = %self.table_name(),
                subject,
                "Tried to remove records from read-only record."
            );
            return Ok(());
        }
        let Some(id) = self.id() else {
            tracing::warn!(table = %self.table_name(), "Tried to query record with no id.");
            return Ok(());
        };
        let db = self.db();
        let resolved = db.resolve(self.entity_name(), subject)?;
        match (resolved.kind, resolved.joining_table) {
            (Relationship::OneToMany, _) => {
                let mut child = db.load(subject, other)?;
                child.delete()
            }
            (Relationship::ManyToMany, Some(joining)) => {
                let mut filter = Modifier::new();
                filter
                    .r#where(
                        format!("{joining}.{}", foreign_key(self.entity_name())),
                        Operator::Eq,
                        id,
                    )
                    .r#where(format!("{joining}.{}", foreign_key(subject)), Operator::Eq, other);
                let sql = DeleteStatement::new(joining.as_str(), filter).to_sql(db.catalog())?;
                tabula_trace_write!("delete", joining);
                db.execute(&sql)?;
                Ok(())
            }
            (kind, _) => {
                tracing::error!(
                    table = %self.table_name(),
                    subject,
                    relationship = %kind,
                    "Tried to remove a record without a one-to-many or many-to-many relationship."
                );
                Ok(())
            }
        }
    }
}
