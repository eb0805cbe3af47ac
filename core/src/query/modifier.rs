//! Joins, filters, grouping, ordering and paging that can be attached to any
//! SELECT, independently of its projection.

use smallvec::SmallVec;

use super::condition::{Conditions, Logic, Operand, Operator};
use super::join::{Join, JoinType};
use crate::{Dialect, SchemaCatalog, Value};

/// ORDER BY entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub desc: bool,
}

/// The composable tail of a SELECT statement.
///
/// ```ignore
/// let mut modifier = Modifier::new();
/// modifier
///     .r#where("role.name", Operator::Eq, "admin")
///     .order_desc("user.name")
///     .limit(10);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Modifier {
    joins: SmallVec<[Join; 4]>,
    wheres: Conditions,
    group_by: Vec<String>,
    havings: Conditions,
    orders: Vec<OrderBy>,
    limit: Option<u64>,
    offset: u64,
}

impl Modifier {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== joins ====================

    pub fn join_with(
        &mut self,
        kind: JoinType,
        table: impl Into<String>,
        on_left: impl Into<String>,
        on_right: impl Into<String>,
    ) -> &mut Self {
        self.joins.push(Join::new(kind, table, on_left, on_right));
        self
    }

    pub fn join(
        &mut self,
        table: impl Into<String>,
        on_left: impl Into<String>,
        on_right: impl Into<String>,
    ) -> &mut Self {
        self.join_with(JoinType::Inner, table, on_left, on_right)
    }

    pub fn left_join(
        &mut self,
        table: impl Into<String>,
        on_left: impl Into<String>,
        on_right: impl Into<String>,
    ) -> &mut Self {
        self.join_with(JoinType::Left, table, on_left, on_right)
    }

    pub fn right_join(
        &mut self,
        table: impl Into<String>,
        on_left: impl Into<String>,
        on_right: impl Into<String>,
    ) -> &mut Self {
        self.join_with(JoinType::Right, table, on_left, on_right)
    }

    pub fn has_join(&self, table: &str) -> bool {
        self.joins.iter().any(|j| j.table == table)
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    // ==================== where ====================

    pub fn r#where(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.wheres.and(column, op, value);
        self
    }

    pub fn or_where(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.wheres.or(column, op, value);
        self
    }

    /// Compares two columns, e.g. `a.x = b.y`.
    pub fn where_column(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        other: impl Into<String>,
    ) -> &mut Self {
        self.wheres
            .compare(Logic::And, column, op, Operand::Column(other.into()));
        self
    }

    pub fn where_in(&mut self, column: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.wheres
            .compare(Logic::And, column, Operator::In, Operand::List(values));
        self
    }

    /// The right-hand side is inserted verbatim; never pass caller input here.
    pub fn where_raw(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        raw: impl Into<String>,
    ) -> &mut Self {
        self.wheres
            .compare(Logic::And, column, op, Operand::Raw(raw.into()));
        self
    }

    /// `column op (subquery)`
    pub fn where_subquery(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        subquery: &str,
    ) -> &mut Self {
        self.where_raw(column, op, format!("({subquery})"))
    }

    /// Adds a bracketed group of conditions.
    pub fn where_group(&mut self, or: bool, f: impl FnOnce(&mut Conditions)) -> &mut Self {
        self.wheres.group(Logic::from_or(or), f);
        self
    }

    pub fn wheres(&self) -> &Conditions {
        &self.wheres
    }

    // ==================== group / having ====================

    pub fn group(&mut self, column: impl Into<String>) -> &mut Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.havings.and(column, op, value);
        self
    }

    pub fn or_having(
        &mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.havings.or(column, op, value);
        self
    }

    // ==================== order / paging ====================

    pub fn order(&mut self, column: impl Into<String>) -> &mut Self {
        self.orders.push(OrderBy {
            column: column.into(),
            desc: false,
        });
        self
    }

    pub fn order_desc(&mut self, column: impl Into<String>) -> &mut Self {
        self.orders.push(OrderBy {
            column: column.into(),
            desc: true,
        });
        self
    }

    pub fn has_order(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self
    }

    // ==================== introspection ====================

    /// Columns referenced by WHERE and HAVING conditions.
    pub fn get_where_columns(&self) -> Vec<&str> {
        let mut columns = self.wheres.columns();
        columns.extend(self.havings.columns());
        columns
    }

    pub fn get_order_columns(&self) -> Vec<&str> {
        self.orders.iter().map(|o| o.column.as_str()).collect()
    }

    /// Distinct table qualifiers (`table` in `table.column`) used by filter and
    /// order columns, in first-seen order.
    pub fn referenced_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        let columns = self
            .get_where_columns()
            .into_iter()
            .chain(self.get_order_columns());
        for column in columns {
            if let Some((table, _)) = column.split_once('.')
                && !table.is_empty()
                && !tables.iter().any(|t| t == table)
            {
                tables.push(table.to_string());
            }
        }
        tables
    }

    /// Appends every clause of `other`. Its filters are ANDed as one group,
    /// its joins skip tables already joined, its paging wins when set.
    pub fn merge(&mut self, other: Modifier) -> &mut Self {
        for join in other.joins {
            if !self.has_join(&join.table) {
                self.joins.push(join);
            }
        }
        if !other.wheres.is_empty() {
            self.wheres
                .push(Logic::And, super::condition::Condition::Group(other.wheres));
        }
        self.group_by.extend(other.group_by);
        if !other.havings.is_empty() {
            self.havings
                .push(Logic::And, super::condition::Condition::Group(other.havings));
        }
        self.orders.extend(other.orders);
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        if other.offset > 0 {
            self.offset = other.offset;
        }
        self
    }

    // ==================== rendering ====================

    /// Only the ` WHERE ...` part (empty when there are no conditions).
    pub fn where_sql(&self, catalog: &dyn SchemaCatalog) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.wheres.to_sql(catalog))
        }
    }

    /// Renders every clause, each preceded by a space, ready to be appended
    /// after `FROM <table>`.
    pub fn to_sql(&self, catalog: &dyn SchemaCatalog) -> String {
        self.render(catalog, true)
    }

    /// Like [`to_sql`](Self::to_sql) but without ORDER BY and paging, for
    /// aggregate queries.
    pub fn to_count_sql(&self, catalog: &dyn SchemaCatalog) -> String {
        self.render(catalog, false)
    }

    fn render(&self, catalog: &dyn SchemaCatalog, with_order: bool) -> String {
        let mut sql = String::new();
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }
        sql.push_str(&self.where_sql(catalog));
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.havings.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.havings.to_sql(catalog));
        }
        if !with_order {
            return sql;
        }
        if !self.orders.is_empty() {
            let orders = self
                .orders
                .iter()
                .map(|o| {
                    if o.desc {
                        format!("{} DESC", o.column)
                    } else {
                        o.column.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders);
        }
        match (self.limit, self.offset) {
            (Some(limit), 0) => sql.push_str(&format!(" LIMIT {limit}")),
            (Some(limit), offset) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (None, 0) => {}
            (None, offset) => sql.push_str(&match catalog.dialect() {
                Dialect::Sqlite => format!(" LIMIT -1 OFFSET {offset}"),
                Dialect::Postgresql => format!(" OFFSET {offset}"),
                Dialect::Mysql => format!(" LIMIT 18446744073709551615 OFFSET {offset}"),
            }),
        }
        sql
    }
}
