//! Error types raised while resolving schemas and running column hooks.

use thiserror::Error;

use crate::Value;

/// Schema-validity failures.
///
/// Raised when a schema is resolved (at migration time) or when an extended
/// type is registered. The schema author has to fix these; retrying never
/// helps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A column declares a type that is neither native nor registered.
    #[error("invalid type '{type_name}' for column '{column}'")]
    InvalidType { column: String, type_name: String },
    /// A table declares no columns at all.
    #[error("table '{0}' has no columns")]
    EmptyTable(String),
    /// The primary key names a column the table does not declare.
    #[error("primary key of table '{table}' names unknown column '{column}'")]
    UnknownPrimaryKeyColumn { table: String, column: String },
    /// An auto-increment column is not the table's sole primary key.
    #[error(
        "column '{column}' of table '{table}' is auto-increment but not the table's sole primary key"
    )]
    AutoIncrementWithoutPrimaryKey { table: String, column: String },
    /// An auto-increment column is not stored as INTEGER.
    #[error("column '{column}' of table '{table}' is auto-increment but stored as {native}")]
    AutoIncrementNotInteger {
        table: String,
        column: String,
        native: String,
    },
    /// A detailed declaration of an extended type sets an option that the
    /// type's own hooks own.
    #[error("column '{column}' of table '{table}' is {type_name}, which does not accept '{option}'")]
    UnsupportedOption {
        table: String,
        column: String,
        type_name: String,
        option: &'static str,
    },
    /// An extended type registration was rejected.
    #[error("invalid type registration '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },
}

/// Failures raised from inside column hooks and transforms.
///
/// The pipelines translate these into the caller-facing error for the
/// operation in flight (a [`ReadOnlyColumn`](HookError::ReadOnlyColumn)
/// becomes an insert or update error, for example).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HookError {
    /// A supplied identifier is not well formed.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// A serializer could not turn the caller's value into a storage value.
    #[error("cannot serialize {value}: {message}")]
    Serialization { value: Value, message: String },
    /// The caller wrote a column that only its type's hooks may write.
    #[error("column '{0}' is managed by its type and cannot be written directly")]
    ReadOnlyColumn(String),
    /// Any other hook-specific failure.
    #[error("{0}")]
    Custom(String),
}
