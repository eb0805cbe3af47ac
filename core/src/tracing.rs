//! Tracing utilities for query and write observability.
//!
//! Every statement the mapper hands to a catalog goes through these macros so
//! a subscriber can follow the generated SQL.

/// Emit a debug-level tracing event with the SQL text.
///
/// ```ignore
/// tabula_trace_query!(&sql);
/// ```
#[macro_export]
macro_rules! tabula_trace_query {
    ($sql:expr) => {
        $crate::__tracing::debug!(sql = %$sql, "tabula.query");
    };
}

/// Emit a debug-level tracing event for a row write (insert, update, upsert, delete).
///
/// ```ignore
/// tabula_trace_write!("insert", "user");
/// ```
#[macro_export]
macro_rules! tabula_trace_write {
    ($kind:literal, $table:expr) => {
        $crate::__tracing::debug!(kind = $kind, table = %$table, "tabula.write");
    };
}
