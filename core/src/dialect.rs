//! SQL dialect differences the mapper has to paper over.

use core::fmt;

/// Database dialect spoken by a catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgresql,
    Mysql,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Postgresql => write!(f, "postgresql"),
            Dialect::Mysql => write!(f, "mysql"),
        }
    }
}

impl Dialect {
    /// Parse a dialect from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "rusqlite" => Some(Dialect::Sqlite),
            "postgresql" | "postgres" | "pg" => Some(Dialect::Postgresql),
            "mysql" | "mariadb" => Some(Dialect::Mysql),
            _ => None,
        }
    }

    /// Wraps a datetime expression so it is projected as an ISO-8601 string
    /// (`YYYY-MM-DDTHH:MM:SS+00:00`).
    pub fn iso_datetime(&self, expr: &str) -> String {
        match self {
            Dialect::Sqlite => format!("strftime('%Y-%m-%dT%H:%M:%S+00:00', {expr})"),
            Dialect::Postgresql => {
                format!("to_char({expr}, 'YYYY-MM-DD\"T\"HH24:MI:SS\"+00:00\"')")
            }
            Dialect::Mysql => format!("DATE_FORMAT({expr}, '%Y-%m-%dT%T+00:00')"),
        }
    }

    /// Renders the clause that turns an INSERT into an upsert on `key`.
    ///
    /// `columns` are the non-key columns to overwrite when the row exists.
    pub fn upsert_clause(&self, key: &str, columns: &[&str]) -> String {
        match self {
            Dialect::Mysql => {
                // MySQL needs at least one assignment; re-assigning the key is a no-op.
                let sets = if columns.is_empty() {
                    format!("{key} = {key}")
                } else {
                    columns
                        .iter()
                        .map(|c| format!("{c} = VALUES({c})"))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(" ON DUPLICATE KEY UPDATE {sets}")
            }
            Dialect::Sqlite | Dialect::Postgresql => {
                if columns.is_empty() {
                    format!(" ON CONFLICT ({key}) DO NOTHING")
                } else {
                    let sets = columns
                        .iter()
                        .map(|c| format!("{c} = excluded.{c}"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!(" ON CONFLICT ({key}) DO UPDATE SET {sets}")
                }
            }
        }
    }

    /// The INSERT tail used when no column is given a value.
    pub fn empty_insert(&self) -> &'static str {
        match self {
            Dialect::Mysql => "() VALUES ()",
            Dialect::Sqlite | Dialect::Postgresql => "DEFAULT VALUES",
        }
    }
}
