//! Table creation and status for a resolved schema.
//!
//! Migration here means creating missing tables: [`Migration::up`] issues
//! every table's `CREATE TABLE IF NOT EXISTS` in one transaction, so it is
//! safe to run any number of times. Existing tables are never altered.
//!
//! # Example
//!
//! ```
//! use rusqlite::Connection;
//! use schemastore_core::{ResolvedSchema, Schema, TableSpec, TypeRegistry};
//! use schemastore_sqlite::Migration;
//!
//! let schema = Schema::new().table("people", TableSpec::new().column("name", "TEXT"));
//! let resolved = ResolvedSchema::resolve(&schema, &TypeRegistry::default()).unwrap();
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let migration = Migration::new(&conn, &resolved);
//! migration.up().unwrap();
//!
//! let status = migration.status().unwrap();
//! assert!(status.is_complete());
//! assert_eq!(status.tables[0].row_count, 0);
//! ```

use rusqlite::Connection;
use schemastore_core::ResolvedSchema;
use serde::Serialize;
use tracing::info;

use crate::error::{DatastoreError, Result};
use crate::schema::{generate_schema_sql, quote_identifier};

/// Creates the tables of a resolved schema and reports on them.
pub struct Migration<'a> {
    conn: &'a Connection,
    schema: &'a ResolvedSchema,
}

impl<'a> Migration<'a> {
    pub fn new(conn: &'a Connection, schema: &'a ResolvedSchema) -> Self {
        Self { conn, schema }
    }

    /// Creates every missing table.
    ///
    /// Runs inside a transaction: either every table exists afterwards or
    /// none of the statements took effect.
    ///
    /// # Errors
    ///
    /// Returns the adapted engine error if a statement fails.
    pub fn up(&self) -> Result<()> {
        let sql = generate_schema_sql(self.schema);
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| DatastoreError::from_engine(e, &sql))?;
        tx.commit()?;
        info!(tables = self.schema.len(), "schema migrated");
        Ok(())
    }

    /// Reports, per schema table, whether it exists and how many rows it
    /// holds.
    pub fn status(&self) -> Result<MigrationStatus> {
        let tables = self
            .schema
            .table_names()
            .map(|name| -> Result<TableStatus> {
                let exists = self.table_exists(name)?;
                let row_count = if exists { self.count_rows(name)? } else { 0 };
                Ok(TableStatus {
                    name: name.to_string(),
                    exists,
                    row_count,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MigrationStatus { tables })
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
        let count: i64 = stmt.query_row([name], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn count_rows(&self, name: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(name));
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| DatastoreError::from_engine(e, &sql))?;
        Ok(count as usize)
    }
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// One entry per schema table, in declaration order.
    pub tables: Vec<TableStatus>,
}

impl MigrationStatus {
    /// Whether every schema table exists.
    pub fn is_complete(&self) -> bool {
        self.tables.iter().all(|t| t.exists)
    }

    pub fn table(&self, name: &str) -> Option<&TableStatus> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStatus {
    pub name: String,
    pub exists: bool,
    pub row_count: usize,
}

#[cfg(test)]
mod tests {
    use schemastore_core::{ColumnOptions, Schema, TableSpec, TypeRegistry};

    use super::*;

    fn schema() -> ResolvedSchema {
        let schema = Schema::new()
            .table(
                "people",
                TableSpec::new()
                    .column("id", ColumnOptions::new("INTEGER").auto_increment())
                    .column("name", "TEXT"),
            )
            .table("pets", TableSpec::new().column("name", "TEXT"));
        ResolvedSchema::resolve(&schema, &TypeRegistry::default()).unwrap()
    }

    #[test]
    fn test_status_on_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = schema();
        let status = Migration::new(&conn, &schema).status().unwrap();
        assert!(!status.is_complete());
        assert_eq!(status.tables.len(), 2);
        assert!(status.tables.iter().all(|t| !t.exists && t.row_count == 0));
    }

    #[test]
    fn test_up_and_status() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = schema();
        let migration = Migration::new(&conn, &schema);
        migration.up().unwrap();
        conn.execute(r#"INSERT INTO "pets" ("name") VALUES ('rex')"#, []).unwrap();

        let status = migration.status().unwrap();
        assert!(status.is_complete());
        assert_eq!(status.table("people").map(|t| t.row_count), Some(0));
        assert_eq!(status.table("pets").map(|t| t.row_count), Some(1));
    }

    #[test]
    fn test_up_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = schema();
        let migration = Migration::new(&conn, &schema);
        migration.up().unwrap();
        conn.execute(r#"INSERT INTO "people" ("name") VALUES ('foo')"#, []).unwrap();
        migration.up().unwrap();
        assert_eq!(migration.status().unwrap().table("people").map(|t| t.row_count), Some(1));
    }

    #[test]
    fn test_status_after_out_of_band_drop() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = schema();
        let migration = Migration::new(&conn, &schema);
        migration.up().unwrap();
        conn.execute_batch(r#"DROP TABLE "pets""#).unwrap();

        let status = migration.status().unwrap();
        assert!(!status.is_complete());
        assert_eq!(status.table("pets").map(|t| t.exists), Some(false));
    }
}
