//! The SQLite PRAGMA statements the catalog relies on.
//!
//! [SQLite PRAGMA Documentation](https://sqlite.org/pragma.html)

use core::fmt;

/// An introspection or configuration pragma.
///
/// ```
/// use tabula_sqlite::pragma::Pragma;
///
/// assert_eq!(Pragma::TableXInfo("user").to_string(), r#"PRAGMA table_xinfo("user")"#);
/// assert_eq!(Pragma::ForeignKeys(true).to_string(), "PRAGMA foreign_keys = ON");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pragma<'a> {
    /// Enable or disable foreign key enforcement
    ///
    /// [SQLite Documentation](https://sqlite.org/pragma.html#pragma_foreign_keys)
    ForeignKeys(bool),
    /// Columns of a table, hidden columns included
    ///
    /// [SQLite Documentation](https://sqlite.org/pragma.html#pragma_table_xinfo)
    TableXInfo(&'a str),
    /// Indexes of a table
    ///
    /// [SQLite Documentation](https://sqlite.org/pragma.html#pragma_index_list)
    IndexList(&'a str),
    /// Key columns of an index
    ///
    /// [SQLite Documentation](https://sqlite.org/pragma.html#pragma_index_info)
    IndexInfo(&'a str),
    /// Counter bumped by every schema change
    ///
    /// [SQLite Documentation](https://sqlite.org/pragma.html#pragma_schema_version)
    SchemaVersion,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl fmt::Display for Pragma<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pragma::ForeignKeys(on) => {
                write!(f, "PRAGMA foreign_keys = {}", if *on { "ON" } else { "OFF" })
            }
            Pragma::TableXInfo(table) => write!(f, "PRAGMA table_xinfo({})", quote_ident(table)),
            Pragma::IndexList(table) => write!(f, "PRAGMA index_list({})", quote_ident(table)),
            Pragma::IndexInfo(index) => write!(f, "PRAGMA index_info({})", quote_ident(index)),
            Pragma::SchemaVersion => f.write_str("PRAGMA schema_version"),
        }
    }
}
