//! The async datastore facade.
//!
//! A [`Datastore`] owns exactly one engine handle behind an async mutex.
//! Nothing happens at construction: the first operation resolves the
//! schema, opens the handle and creates missing tables, once. Statements
//! then run one at a time on that handle.
//!
//! # Example
//!
//! ```
//! use schemastore_core::{ColumnOptions, Criteria, Record, Schema, TableSpec};
//! use schemastore_sqlite::{Datastore, DeleteOptions, SelectOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let schema = Schema::new().table(
//!     "people",
//!     TableSpec::new()
//!         .column("id", ColumnOptions::new("INTEGER").auto_increment())
//!         .column("name", "TEXT")
//!         .column("birthdate", ColumnOptions::new("TEXT").nullable()),
//! );
//! let store = Datastore::in_memory(schema);
//!
//! store.insert("people", vec![
//!     Record::new().with("name", "foo"),
//!     Record::new().with("name", "bar"),
//! ]).await.unwrap();
//!
//! let deleted = store
//!     .delete("people", DeleteOptions::filter(Criteria::new().eq("name", "foo")))
//!     .await
//!     .unwrap();
//! assert_eq!(deleted, 1);
//!
//! let rows = store.select("people", SelectOptions::new()).await.unwrap();
//! assert_eq!(rows.len(), 1);
//! store.close().await.unwrap();
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;
use schemastore_core::{Record, ResolvedSchema, Schema, TableDescriptor, TypeRegistry};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::DatastoreConfig;
use crate::error::{DatastoreError, Result};
use crate::migration::{Migration, MigrationStatus};
use crate::options::{DeleteOptions, InsertOptions, InsertResult, Records, SelectOptions, UpdateOptions};
use crate::query::TableQuery;

#[derive(Default)]
struct State {
    conn: Option<Connection>,
    resolved: Option<ResolvedSchema>,
    migrated: bool,
    closed: bool,
}

/// Typed access to one SQLite database described by a [`Schema`].
pub struct Datastore {
    config: DatastoreConfig,
    schema: Schema,
    registry: Arc<TypeRegistry>,
    state: Mutex<State>,
}

impl Datastore {
    /// Creates a datastore. The database is not touched until the first
    /// operation.
    pub fn open(config: DatastoreConfig, schema: Schema, registry: Arc<TypeRegistry>) -> Self {
        Self {
            config,
            schema,
            registry,
            state: Mutex::new(State::default()),
        }
    }

    /// An in-memory datastore using the built-in types.
    pub fn in_memory(schema: Schema) -> Self {
        Self::open(DatastoreConfig::in_memory(), schema, Arc::new(TypeRegistry::default()))
    }

    /// The database path, or `:memory:`.
    pub fn filename(&self) -> &str {
        &self.config.filename
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Declared table names, in declaration order.
    pub fn tables(&self) -> Vec<String> {
        self.schema.table_names().map(String::from).collect()
    }

    /// Creates any missing tables.
    ///
    /// Every operation migrates on first use, so calling this is optional.
    /// Calling it again re-issues the `CREATE TABLE IF NOT EXISTS`
    /// statements, which recreates tables dropped out of band.
    ///
    /// # Errors
    ///
    /// [`DatastoreError::InvalidSchema`] if the schema does not resolve,
    /// [`DatastoreError::Closed`] after [`close`](Self::close), or any
    /// adapted engine error.
    pub async fn migrate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.migrated = false;
        self.ready(&mut state, None).map(|_| ())
    }

    /// Inserts one record or a batch into `table`.
    ///
    /// See [`TableQuery::insert`] for the column and hook rules.
    pub async fn insert(&self, table: &str, records: impl Into<Records>) -> Result<InsertResult> {
        self.insert_with(InsertOptions::new(table, records)).await
    }

    /// Inserts using the canonical options shape.
    pub async fn insert_with(&self, options: InsertOptions) -> Result<InsertResult> {
        let InsertOptions {
            table,
            records,
            return_ids,
        } = options;
        self.with_table(&table, |query| query.insert(records.into_vec(), return_ids))
            .await
    }

    /// Selects rows, parsed through each column's parse transform.
    pub async fn select(&self, table: &str, options: impl Into<SelectOptions>) -> Result<Vec<Record>> {
        let options = options.into();
        self.with_table(table, |query| query.select(options.filter.as_ref()))
            .await
    }

    /// Selects rows and deserializes each into `T`.
    ///
    /// # Errors
    ///
    /// [`DatastoreError::ConversionError`] if a row does not fit `T`, plus
    /// everything [`select`](Self::select) can return.
    pub async fn select_as<T: DeserializeOwned>(
        &self,
        table: &str,
        options: impl Into<SelectOptions>,
    ) -> Result<Vec<T>> {
        self.select(table, options)
            .await?
            .iter()
            .map(|record| {
                record.deserialize_into::<T>().map_err(|e| {
                    DatastoreError::ConversionError(format!("cannot deserialize row of '{table}': {e}"))
                })
            })
            .collect()
    }

    /// Counts rows.
    pub async fn count(&self, table: &str, options: impl Into<SelectOptions>) -> Result<usize> {
        let options = options.into();
        self.with_table(table, |query| query.count(options.filter.as_ref()))
            .await
    }

    /// Updates rows and returns how many were affected.
    pub async fn update(&self, table: &str, options: UpdateOptions) -> Result<usize> {
        self.with_table(table, |query| query.update(&options.set, options.filter.as_ref()))
            .await
    }

    /// Deletes rows and returns how many were affected.
    ///
    /// The options must name exactly one of `all` and `where`; anything
    /// else is rejected before the database is touched.
    pub async fn delete(&self, table: &str, options: impl Into<DeleteOptions>) -> Result<usize> {
        let scope = options.into().scope(table)?;
        self.with_table(table, |query| query.delete(&scope)).await
    }

    /// Reports, per table, whether it exists and how many rows it holds.
    ///
    /// Does not create missing tables.
    pub async fn status(&self) -> Result<MigrationStatus> {
        let mut state = self.state.lock().await;
        self.resolve(&mut state)?;
        self.connect(&mut state)?;
        let (Some(conn), Some(resolved)) = (state.conn.as_ref(), state.resolved.as_ref()) else {
            return Err(DatastoreError::Closed);
        };
        Migration::new(conn, resolved).status()
    }

    /// Closes the engine handle. Every later call returns
    /// [`DatastoreError::Closed`], including a second `close`.
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(DatastoreError::Closed);
        }
        state.closed = true;
        if let Some(conn) = state.conn.take() {
            conn.close().map_err(|(_, e)| DatastoreError::from(e))?;
            info!(filename = %self.config.filename, "closed database");
        }
        Ok(())
    }

    async fn with_table<T>(&self, table: &str, op: impl FnOnce(TableQuery<'_>) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().await;
        let (conn, descriptor) = self.ready(&mut state, Some(table))?;
        let descriptor = descriptor.ok_or_else(|| DatastoreError::NoSuchTable(table.to_string()))?;
        op(TableQuery::new(conn, descriptor))
    }

    /// Brings the state up to a migrated, open handle.
    ///
    /// An unknown `table` is reported before the engine is opened.
    fn ready<'s>(
        &self,
        state: &'s mut State,
        table: Option<&str>,
    ) -> Result<(&'s Connection, Option<&'s TableDescriptor>)> {
        self.resolve(state)?;
        if let Some(table) = table {
            if state.resolved.as_ref().and_then(|r| r.get(table)).is_none() {
                return Err(DatastoreError::NoSuchTable(table.to_string()));
            }
        }
        self.connect(state)?;

        let (Some(conn), Some(resolved)) = (state.conn.as_ref(), state.resolved.as_ref()) else {
            return Err(DatastoreError::Closed);
        };
        if !state.migrated {
            Migration::new(conn, resolved).up()?;
            state.migrated = true;
        }
        Ok((conn, table.and_then(|t| resolved.get(t))))
    }

    fn resolve(&self, state: &mut State) -> Result<()> {
        if state.closed {
            return Err(DatastoreError::Closed);
        }
        if state.resolved.is_none() {
            state.resolved = Some(ResolvedSchema::resolve(&self.schema, &self.registry)?);
        }
        Ok(())
    }

    fn connect(&self, state: &mut State) -> Result<()> {
        if state.conn.is_none() {
            state.conn = Some(self.config.open_connection()?);
        }
        Ok(())
    }
}

impl fmt::Debug for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastore")
            .field("filename", &self.config.filename)
            .field("tables", &self.tables())
            .finish_non_exhaustive()
    }
}
