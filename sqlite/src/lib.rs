//! SQLite backend for schema-described datastores.
//!
//! Given a [`Schema`](schemastore_core::Schema) and a
//! [`TypeRegistry`](schemastore_core::TypeRegistry), this crate creates the
//! tables and runs typed insert, select, count, update and delete
//! operations against them, with column hooks applied on every write and
//! parse transforms on every read.
//!
//! # Architecture
//!
//! - **`schema`** — `CREATE TABLE IF NOT EXISTS` generation
//! - **`criteria`** — [`Criteria`](schemastore_core::Criteria) to parameterized `WHERE`
//! - **`query`** — the per-table pipelines ([`TableQuery`])
//! - **`migration`** — table creation and status ([`Migration`])
//! - **`error`** — [`DatastoreError`] and the engine error adapter
//! - **`config`** — [`DatastoreConfig`] and schema documents on disk
//! - **`datastore`** — the async facade ([`Datastore`])
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use schemastore_core::{Criteria, Record, TypeRegistry};
//! use schemastore_sqlite::{Datastore, DatastoreConfig, SelectOptions, UpdateOptions, load_schema};
//!
//! # #[tokio::main]
//! # async fn main() -> schemastore_sqlite::Result<()> {
//! let config = DatastoreConfig::load("datastore.yaml")?;
//! let schema = load_schema("schema.yaml")?;
//! let store = Datastore::open(config, schema, Arc::new(TypeRegistry::default()));
//!
//! store.insert("people", Record::new().with("name", "foo")).await?;
//! store
//!     .update("people", UpdateOptions::new(Record::new().with("name", "bar")))
//!     .await?;
//!
//! let people = store
//!     .select("people", Criteria::new().any_of("name", ["foo", "bar"]))
//!     .await?;
//! println!("{} people", people.len());
//!
//! let total = store.count("people", SelectOptions::new()).await?;
//! println!("{total} rows");
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod convert;
mod criteria;
mod datastore;
mod error;
mod migration;
mod options;
mod query;
mod schema;

pub use config::{DatastoreConfig, MEMORY, load_schema};
pub use criteria::{WhereClause, compile_where};
pub use datastore::Datastore;
pub use error::{DatastoreError, Result};
pub use migration::{Migration, MigrationStatus, TableStatus};
pub use options::{
    DeleteOptions, DeleteScope, InsertOptions, InsertResult, Records, SelectOptions, UpdateOptions,
};
pub use query::TableQuery;
pub use schema::{generate_create_table_sql, generate_schema_sql, generate_table_sql, quote_identifier};
