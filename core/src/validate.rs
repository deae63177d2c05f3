//! Table-level schema checks.
//!
//! Column types are checked by [`resolve_column`](crate::resolve_column);
//! the checks here need the whole table: the primary key must name declared
//! columns, and auto-increment is only valid on the table's sole INTEGER
//! primary key column (the only place the engine accepts `AUTOINCREMENT`).

use crate::{ColumnDescriptor, NativeType, SchemaError};

/// Checks that every primary-key column is declared.
pub(crate) fn validate_primary_key(
    table: &str,
    columns: &[ColumnDescriptor],
    primary_key: &[String],
) -> Result<(), SchemaError> {
    for key in primary_key {
        if !columns.iter().any(|c| &c.name == key) {
            return Err(SchemaError::UnknownPrimaryKeyColumn {
                table: table.to_string(),
                column: key.clone(),
            });
        }
    }
    Ok(())
}

/// Checks every auto-increment column against the resolved primary key.
pub(crate) fn validate_auto_increment(
    table: &str,
    columns: &[ColumnDescriptor],
    primary_key: &[String],
) -> Result<(), SchemaError> {
    for column in columns.iter().filter(|c| c.auto_increment) {
        if column.native != NativeType::Integer {
            return Err(SchemaError::AutoIncrementNotInteger {
                table: table.to_string(),
                column: column.name.clone(),
                native: column.native.to_string(),
            });
        }
        if primary_key != std::slice::from_ref(&column.name) {
            return Err(SchemaError::AutoIncrementWithoutPrimaryKey {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }
    }
    Ok(())
}
