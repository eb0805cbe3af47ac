//! Conversions between rusqlite values/errors and tabula's.

use rusqlite::types::ValueRef;
use rusqlite::{Error, ErrorCode, ffi};
use tabula_core::{ConstraintKind, TabulaError, Value};

/// Owned copy of a borrowed column value.
pub fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(items) => Value::Text(String::from_utf8_lossy(items).into_owned()),
        ValueRef::Blob(items) => Value::Blob(items.to_vec().into_boxed_slice()),
    }
}

/// Maps an extended SQLite result code onto a constraint kind.
pub fn constraint_kind(extended_code: i32) -> ConstraintKind {
    match extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            ConstraintKind::Duplicate
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
        ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
        ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
        _ => ConstraintKind::Other,
    }
}

/// Classifies a driver error: constraint failures keep their kind, anything
/// else becomes an execution error.
pub fn classify(err: Error) -> TabulaError {
    match &err {
        Error::SqliteFailure(failure, message) if failure.code == ErrorCode::ConstraintViolation => {
            let message = message.clone().unwrap_or_else(|| err.to_string());
            TabulaError::constraint(constraint_kind(failure.extended_code), message)
        }
        _ => TabulaError::Execution(err.to_string()),
    }
}
