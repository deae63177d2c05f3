//! Error types for datastore operations.
//!
//! [`DatastoreError`] is the single error surfaced to callers. Engine
//! failures are classified by [`DatastoreError::from_engine`], which reads
//! the native error code and message; pipeline validation failures are
//! raised directly.

use std::sync::LazyLock;

use regex::Regex;
use rusqlite::ErrorCode;
use schemastore_core::{HookError, SchemaError, Value};
use thiserror::Error;

/// Errors that can occur during datastore operations.
#[derive(Debug, Error)]
pub enum DatastoreError {
    /// The schema could not be resolved.
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// An insert was rejected before reaching the engine.
    #[error("insert into '{table}' failed: {message}")]
    InsertError { table: String, message: String },

    /// An update was rejected before reaching the engine.
    #[error("update of '{table}' failed: {message}")]
    UpdateError { table: String, message: String },

    /// A supplied identifier is malformed.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A column serializer rejected the caller's value.
    #[error("cannot serialize {value}: {message}")]
    SerializationError { value: Value, message: String },

    /// A stored value could not be converted back.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// A filter that cannot be compiled, such as an empty operator object.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// A delete named neither `all` nor `where`.
    #[error("delete from '{0}' requires either `all` or a `where` clause")]
    MissingDeleteScope(String),

    /// A delete named both `all` and `where`.
    #[error("delete from '{0}' accepts `all` or `where`, not both")]
    AmbiguousDeleteScope(String),

    /// The table is unknown to the schema or missing from the database.
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// A statement referenced a column the table does not have.
    #[error("no such column: {0}")]
    NoSuchColumn(String),

    /// The engine rejected the statement text.
    #[error("syntax error: {message} (in `{sql}`)")]
    SyntaxError { message: String, sql: String },

    /// A UNIQUE constraint was violated.
    #[error("UNIQUE constraint failed: {table}.{column}")]
    UniqueConstraintViolation { table: String, column: String },

    /// A NOT NULL constraint was violated.
    #[error("NOT NULL constraint failed: {table}.{column}")]
    NotNullConstraintViolation { table: String, column: String },

    /// Any other native engine failure.
    #[error("database error ({code}): {message}")]
    UnknownError { code: i32, message: String },

    /// Engine-side failure without a native error code.
    #[error("database error: {0}")]
    DatabaseError(rusqlite::Error),

    /// The datastore was closed.
    #[error("datastore is closed")]
    Closed,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Convenience alias for results with [`DatastoreError`].
pub type Result<T> = std::result::Result<T, DatastoreError>;

/// Which write pipeline a hook failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pipeline {
    Insert,
    Update,
}

static NO_SUCH_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"no such table: (?:main\.)?([^\s,]+)").expect("static regex must compile"));
static NO_SUCH_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"no such column: ([^\s,]+)").expect("static regex must compile"));
static SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"syntax error|incomplete input|unrecognized token").expect("static regex must compile"));
static UNIQUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UNIQUE constraint failed: (.+)").expect("static regex must compile"));
static NOT_NULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"NOT NULL constraint failed: ([^.\s]+)\.([^\s,]+)").expect("static regex must compile")
});

impl DatastoreError {
    /// Classifies an engine error.
    ///
    /// `sql` is kept on [`SyntaxError`](Self::SyntaxError) errors for diagnostics.
    /// Errors without a native error code are passed through as
    /// [`DatabaseError`](Self::DatabaseError).
    pub fn from_engine(err: rusqlite::Error, sql: &str) -> Self {
        let Some(native) = err.sqlite_error().copied() else {
            return DatastoreError::DatabaseError(err);
        };
        let message = err.to_string();

        if native.code == ErrorCode::ConstraintViolation {
            if let Some(caps) = UNIQUE.captures(&message) {
                let (table, column) = split_constraint_columns(&caps[1]);
                return DatastoreError::UniqueConstraintViolation { table, column };
            }
            if let Some(caps) = NOT_NULL.captures(&message) {
                return DatastoreError::NotNullConstraintViolation {
                    table: caps[1].to_string(),
                    column: caps[2].to_string(),
                };
            }
        }
        if let Some(caps) = NO_SUCH_TABLE.captures(&message) {
            return DatastoreError::NoSuchTable(caps[1].to_string());
        }
        if let Some(caps) = NO_SUCH_COLUMN.captures(&message) {
            return DatastoreError::NoSuchColumn(caps[1].to_string());
        }
        if SYNTAX.is_match(&message) {
            return DatastoreError::SyntaxError {
                message,
                sql: sql.to_string(),
            };
        }
        DatastoreError::UnknownError {
            code: native.extended_code,
            message,
        }
    }

    /// Translates a hook failure for the pipeline it came from.
    pub(crate) fn from_hook(err: HookError, pipeline: Pipeline, table: &str) -> Self {
        match err {
            HookError::InvalidIdentifier(id) => DatastoreError::InvalidIdentifier(id),
            HookError::Serialization { value, message } => {
                DatastoreError::SerializationError { value, message }
            }
            other => {
                let message = other.to_string();
                let table = table.to_string();
                match pipeline {
                    Pipeline::Insert => DatastoreError::InsertError { table, message },
                    Pipeline::Update => DatastoreError::UpdateError { table, message },
                }
            }
        }
    }
}

impl From<rusqlite::Error> for DatastoreError {
    fn from(err: rusqlite::Error) -> Self {
        DatastoreError::from_engine(err, "")
    }
}

/// Splits `t.a, t.b` into the table name and the joined column names.
fn split_constraint_columns(list: &str) -> (String, String) {
    let mut table = String::new();
    let columns: Vec<&str> = list
        .split(", ")
        .map(|qualified| {
            let (t, c) = qualified.trim().split_once('.').unwrap_or(("", qualified.trim()));
            if table.is_empty() {
                table = t.to_string();
            }
            c
        })
        .collect();
    (table, columns.join(", "))
}
