//! Schema model and column behavior for typed SQLite datastores.
//!
//! This crate holds everything that does not need a database connection:
//!
//! - [`Value`] and [`Record`] — logical cell values and rows.
//! - [`Schema`], [`TableSpec`], [`ColumnDecl`] — the declarative schema a
//!   caller writes, in code or as JSON/YAML.
//! - [`TypeRegistry`] and [`ExtendedType`] — named column types (`UUID`,
//!   `CREATED_AT`, `UPDATED_AT`, `BOOLEAN`, or your own) layered on a native
//!   storage type with lifecycle hooks.
//! - [`resolve_column`], [`TableDescriptor`], [`ResolvedSchema`] — resolution
//!   of raw declarations into canonical descriptors, with validation.
//! - [`Criteria`] — declarative row filters.
//!
//! # Example
//!
//! ```
//! use schemastore_core::*;
//!
//! let schema = Schema::new().table(
//!     "people",
//!     TableSpec::new()
//!         .column("id", ColumnOptions::new("INTEGER").auto_increment())
//!         .column("uid", "UUID")
//!         .column("name", "TEXT")
//!         .column("birthdate", ColumnOptions::new("TEXT").nullable()),
//! );
//!
//! let resolved = ResolvedSchema::resolve(&schema, &TypeRegistry::default()).unwrap();
//! let people = resolved.get("people").unwrap();
//! assert_eq!(people.primary_key(), ["id"]);
//! assert_eq!(people.insert_hooks().len(), 1);
//! ```

mod criteria;
mod error;
pub mod registry;
mod resolve;
mod table;
mod types;
mod validate;
mod value;

pub use criteria::{Condition, Criteria, Operator, Operators};
pub use error::{HookError, SchemaError};
pub use registry::{ExtendedType, RecordHook, Transform, TypeRegistry};
pub use resolve::{ColumnDescriptor, resolve_column};
pub use table::{ResolvedSchema, TableDescriptor};
pub use types::*;
pub use value::{Record, Value, format_timestamp, parse_timestamp};
