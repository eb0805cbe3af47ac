use core::fmt;

use thiserror::Error;

/// What kind of constraint a write violated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    /// A unique or primary key would have been duplicated
    Duplicate,
    /// A referenced row does not exist (or is still referenced)
    ForeignKey,
    /// A NOT NULL column received NULL
    NotNull,
    /// A CHECK constraint failed
    Check,
    /// Any other constraint reported by the driver
    Other,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ConstraintKind::Duplicate => "duplicate key",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::NotNull => "not null",
            ConstraintKind::Check => "check",
            ConstraintKind::Other => "constraint",
        };
        f.write_str(kind)
    }
}

/// A constraint failure surfaced from the write path, already classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(kind: ConstraintKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation: {}", self.kind, self.message)
    }
}

#[derive(Debug, Error)]
pub enum TabulaError {
    /// The caller supplied an invalid argument (unknown column, bad id, ...)
    #[error("Invalid argument \"{name}\": {value}")]
    Argument { name: String, value: String },

    /// The database schema does not have the shape the mapper requires
    #[error("Schema error: {0}")]
    Schema(String),

    /// A mandatory load did not find its row
    #[error("Load failed to find record for {table} with {key} = {id}")]
    RecordNotFound { table: String, key: String, id: i64 },

    /// Record values failed validation before being written
    #[error("Validation error: {0}")]
    Validation(String),

    /// An accessor name that is not registered for the entity
    #[error("Call to undefined operation: {0}")]
    NoSuchOperation(String),

    /// A write violated a database constraint
    #[error("{0}")]
    Constraint(ConstraintViolation),

    /// Any other failure reported by the driver
    #[error("Execution error: {0}")]
    Execution(String),

    /// Query builder misuse
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TabulaError {
    /// Shorthand for an argument error.
    pub fn argument(name: impl Into<String>, value: impl fmt::Display) -> Self {
        TabulaError::Argument {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// Shorthand for a constraint error.
    pub fn constraint(kind: ConstraintKind, message: impl Into<String>) -> Self {
        TabulaError::Constraint(ConstraintViolation::new(kind, message))
    }

    /// Caller-input violations.
    pub fn is_argument(&self) -> bool {
        matches!(self, TabulaError::Argument { .. } | TabulaError::NoSuchOperation(_))
    }

    /// Unrecoverable errors for the current operation (schema shape, missing
    /// mandatory rows, failed validation).
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            TabulaError::Schema(_)
                | TabulaError::RecordNotFound { .. }
                | TabulaError::Validation(_)
                | TabulaError::Query(_)
        )
    }

    /// The constraint kind, when this error came from a constraint violation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            TabulaError::Constraint(violation) => Some(violation.kind),
            _ => None,
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, TabulaError::Constraint(_))
    }

    pub fn is_duplicate(&self) -> bool {
        self.constraint_kind() == Some(ConstraintKind::Duplicate)
    }
}

/// Result type for mapper operations
pub type Result<T> = std::result::Result<T, TabulaError>;
