//! WHERE / HAVING condition trees.

use core::fmt;

use crate::{SchemaCatalog, Value};

/// Comparison operator of a single condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Operator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    /// Parses the textual operator forms accepted by external callers.
    pub fn parse(op: &str) -> Option<Self> {
        let op = match op.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::NotEq,
            "<" => Operator::Lt,
            "<=" => Operator::LtEq,
            ">" => Operator::Gt,
            ">=" => Operator::GtEq,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A literal, formatted by the catalog
    Value(Value),
    /// A literal list for IN / NOT IN
    List(Vec<Value>),
    /// Another column reference
    Column(String),
    /// Unescaped SQL, e.g. a parenthesized subquery
    Raw(String),
}

/// How a condition attaches to the ones before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub const fn from_or(or: bool) -> Self {
        if or { Logic::Or } else { Logic::And }
    }

    const fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Operator,
        rhs: Operand,
    },
    /// A bracketed sub-list
    Group(Conditions),
}

/// An ordered list of conditions joined by AND/OR.
///
/// The connective of the first entry is ignored when rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conditions {
    items: Vec<(Logic, Condition)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, logic: Logic, condition: Condition) -> &mut Self {
        self.items.push((logic, condition));
        self
    }

    pub fn compare(
        &mut self,
        logic: Logic,
        column: impl Into<String>,
        op: Operator,
        rhs: Operand,
    ) -> &mut Self {
        self.push(
            logic,
            Condition::Compare {
                column: column.into(),
                op,
                rhs,
            },
        )
    }

    /// `column op value`, ANDed
    pub fn and(&mut self, column: impl Into<String>, op: Operator, value: impl Into<Value>) -> &mut Self {
        self.compare(Logic::And, column, op, Operand::Value(value.into()))
    }

    /// `column op value`, ORed
    pub fn or(&mut self, column: impl Into<String>, op: Operator, value: impl Into<Value>) -> &mut Self {
        self.compare(Logic::Or, column, op, Operand::Value(value.into()))
    }

    /// Adds a bracketed group built by `f`. Empty groups are dropped.
    pub fn group(&mut self, logic: Logic, f: impl FnOnce(&mut Conditions)) -> &mut Self {
        let mut group = Conditions::new();
        f(&mut group);
        if !group.is_empty() {
            self.push(logic, Condition::Group(group));
        }
        self
    }

    /// Every left-hand column referenced, depth first.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        for (_, condition) in &self.items {
            match condition {
                Condition::Compare { column, .. } => out.push(column),
                Condition::Group(group) => group.collect_columns(out),
            }
        }
    }

    pub fn to_sql(&self, catalog: &dyn SchemaCatalog) -> String {
        let mut sql = String::new();
        for (index, (logic, condition)) in self.items.iter().enumerate() {
            if index > 0 {
                sql.push(' ');
                sql.push_str(logic.as_str());
                sql.push(' ');
            }
            match condition {
                Condition::Compare { column, op, rhs } => {
                    sql.push_str(&render_compare(catalog, column, *op, rhs));
                }
                Condition::Group(group) => {
                    sql.push('(');
                    sql.push_str(&group.to_sql(catalog));
                    sql.push(')');
                }
            }
        }
        sql
    }
}

fn render_compare(catalog: &dyn SchemaCatalog, column: &str, op: Operator, rhs: &Operand) -> String {
    match rhs {
        Operand::Value(Value::Null) if op == Operator::Eq => format!("{column} IS NULL"),
        Operand::Value(Value::Null) if op == Operator::NotEq => format!("{column} IS NOT NULL"),
        Operand::Value(value) => format!("{column} {op} {}", catalog.format_string(value)),
        Operand::List(values) if values.is_empty() => match op {
            // nothing is in an empty set
            Operator::NotIn => "1 = 1".to_string(),
            _ => "1 = 0".to_string(),
        },
        Operand::List(values) => {
            let list = values
                .iter()
                .map(|v| catalog.format_string(v))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{column} {op} ({list})")
        }
        Operand::Column(other) => format!("{column} {op} {other}"),
        Operand::Raw(raw) => format!("{column} {op} {raw}"),
    }
}
