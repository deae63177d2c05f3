//! Resolved tables and schemas.
//!
//! A [`TableDescriptor`] is built once per table when the schema is
//! resolved. Besides the resolved columns and primary key, it carries the
//! ordered `(column, hook)` lists the write pipelines run: hooks fire in
//! schema declaration order, so a later hook can read what an earlier one
//! wrote.

use std::fmt;

use indexmap::IndexMap;

use crate::registry::{RecordHook, TypeRegistry};
use crate::validate::{validate_auto_increment, validate_primary_key};
use crate::{ColumnDescriptor, NativeType, Schema, SchemaError, TableSpec, resolve_column};

/// Fully resolved table.
#[derive(Clone)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Vec<String>,
    insert_hooks: Vec<(String, RecordHook)>,
    update_hooks: Vec<(String, RecordHook)>,
}

impl TableDescriptor {
    /// Resolves and validates a table declaration.
    ///
    /// The primary key is the declared one, else `id` when such a column
    /// exists, else none.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unknown column types, an empty table,
    /// a primary key naming an undeclared column, or a misplaced
    /// auto-increment column.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemastore_core::{ColumnOptions, TableDescriptor, TableSpec, TypeRegistry};
    ///
    /// let spec = TableSpec::new()
    ///     .column("id", ColumnOptions::new("INTEGER").auto_increment())
    ///     .column("name", "TEXT");
    /// let table = TableDescriptor::resolve("people", &spec, &TypeRegistry::default()).unwrap();
    /// assert_eq!(table.primary_key(), ["id"]);
    /// assert!(table.has_auto_increment());
    /// ```
    pub fn resolve(name: &str, spec: &TableSpec, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        if spec.columns.is_empty() {
            return Err(SchemaError::EmptyTable(name.to_string()));
        }

        let columns = spec
            .columns
            .iter()
            .map(|(column, decl)| resolve_column(name, column, decl, registry))
            .collect::<Result<Vec<_>, _>>()?;

        let primary_key: Vec<String> = match &spec.primary_key {
            Some(pk) => pk.columns().into_iter().map(String::from).collect(),
            None if spec.columns.contains_key("id") => vec!["id".to_string()],
            None => Vec::new(),
        };

        validate_primary_key(name, &columns, &primary_key)?;
        validate_auto_increment(name, &columns, &primary_key)?;

        let insert_hooks = columns
            .iter()
            .filter_map(|c| c.before_insert.clone().map(|h| (c.name.clone(), h)))
            .collect();
        let update_hooks = columns
            .iter()
            .filter_map(|c| c.before_update.clone().map(|h| (c.name.clone(), h)))
            .collect();

        Ok(Self {
            name: name.to_string(),
            columns,
            primary_key,
            insert_hooks,
            update_hooks,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    pub fn has_auto_increment(&self) -> bool {
        self.columns.iter().any(|c| c.auto_increment)
    }

    /// The column aliasing the engine's row id: a sole INTEGER primary key.
    ///
    /// The engine assigns it when an insert leaves it out.
    pub fn rowid_column(&self) -> Option<&ColumnDescriptor> {
        match self.primary_key.as_slice() {
            [key] => self.column(key).filter(|c| c.native == NativeType::Integer),
            _ => None,
        }
    }

    /// Before-insert hooks in declaration order.
    pub fn insert_hooks(&self) -> &[(String, RecordHook)] {
        &self.insert_hooks
    }

    /// Before-update hooks in declaration order.
    pub fn update_hooks(&self) -> &[(String, RecordHook)] {
        &self.update_hooks
    }
}

impl fmt::Debug for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hook_columns = |hooks: &[(String, RecordHook)]| {
            hooks.iter().map(|(c, _)| c.clone()).collect::<Vec<_>>()
        };
        f.debug_struct("TableDescriptor")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("insert_hooks", &hook_columns(&self.insert_hooks))
            .field("update_hooks", &hook_columns(&self.update_hooks))
            .finish()
    }
}

/// Every table of a [`Schema`], resolved, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    tables: IndexMap<String, TableDescriptor>,
}

impl ResolvedSchema {
    /// Resolves every table, stopping at the first invalid one.
    ///
    /// # Errors
    ///
    /// Propagates the first [`SchemaError`] found.
    pub fn resolve(schema: &Schema, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let tables = schema
            .iter()
            .map(|(name, spec)| {
                TableDescriptor::resolve(name, spec, registry).map(|table| (name.to_string(), table))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;
        Ok(Self { tables })
    }

    pub fn get(&self, table: &str) -> Option<&TableDescriptor> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
