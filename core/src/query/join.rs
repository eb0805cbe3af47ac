//! Join clauses used by [`Modifier`](super::Modifier).

/// The type of JOIN operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// `<kind> <table> ON <on_left> = <on_right>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinType,
    pub table: String,
    pub on_left: String,
    pub on_right: String,
}

impl Join {
    pub fn new(
        kind: JoinType,
        table: impl Into<String>,
        on_left: impl Into<String>,
        on_right: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            on_left: on_left.into(),
            on_right: on_right.into(),
        }
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} {} ON {} = {}",
            self.kind.as_str(),
            self.table,
            self.on_left,
            self.on_right
        )
    }
}
