//! Extended column types.
//!
//! An extended type is a named bundle of column behavior layered on one
//! native storage type: default nullability and uniqueness, plus optional
//! before-insert, before-update, and parse hooks. Types are plain data
//! records looked up by name, so adding one never touches the pipelines.
//!
//! # Built-in types
//!
//! | name         | storage | unique | behavior                                             |
//! |--------------|---------|--------|------------------------------------------------------|
//! | `UUID`       | TEXT    | yes    | generates a v4 identifier when absent, validates it  |
//! | `CREATED_AT` | TEXT    | no     | stamped on insert, read-only afterwards              |
//! | `UPDATED_AT` | TEXT    | no     | stamped on insert and on every update                |
//! | `BOOLEAN`    | INTEGER | no     | stores `0`/`1`, reads back [`Value::Bool`]           |
//!
//! # Examples
//!
//! ```
//! use schemastore_core::{ExtendedType, NativeType, TypeRegistry, Value};
//!
//! let mut registry = TypeRegistry::default();
//! registry
//!     .register(
//!         ExtendedType::new("EMAIL", NativeType::Text)
//!             .unique(true)
//!             .parse(|v| Ok(v.clone())),
//!     )
//!     .unwrap();
//! assert!(registry.contains("EMAIL"));
//! assert!(registry.contains("UUID"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::value::{format_timestamp, parse_timestamp};
use crate::{HookError, NativeType, Record, SchemaError, Value};

/// A value-to-value transform (parse on read, serialize on write).
pub type Transform = Arc<dyn Fn(&Value) -> Result<Value, HookError> + Send + Sync>;

/// A hook run against a record's working copy before it is written.
///
/// Receives the name of the column the hook belongs to. Hooks may fill in,
/// rewrite, or reject that column's value.
pub type RecordHook = Arc<dyn Fn(&str, &mut Record) -> Result<(), HookError> + Send + Sync>;

/// Generated v4 identifier.
pub const UUID: &str = "UUID";
/// Timestamp stamped once when the row is inserted.
pub const CREATED_AT: &str = "CREATED_AT";
/// Timestamp stamped on insert and on every update.
pub const UPDATED_AT: &str = "UPDATED_AT";
/// Boolean stored as `0`/`1`.
pub const BOOLEAN: &str = "BOOLEAN";

/// A registered extended type.
#[derive(Clone)]
pub struct ExtendedType {
    name: String,
    native: NativeType,
    nullable: bool,
    unique: bool,
    before_insert: Option<RecordHook>,
    before_update: Option<RecordHook>,
    parse: Option<Transform>,
}

impl ExtendedType {
    /// Creates a non-nullable, non-unique type with no hooks.
    pub fn new(name: impl Into<String>, native: NativeType) -> Self {
        Self {
            name: name.into(),
            native,
            nullable: false,
            unique: false,
            before_insert: None,
            before_update: None,
            parse: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn before_insert<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_insert = Some(Arc::new(hook));
        self
    }

    pub fn before_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut Record) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_update = Some(Arc::new(hook));
        self
    }

    pub fn parse<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(transform));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> NativeType {
        self.native
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn before_insert_hook(&self) -> Option<&RecordHook> {
        self.before_insert.as_ref()
    }

    pub fn before_update_hook(&self) -> Option<&RecordHook> {
        self.before_update.as_ref()
    }

    pub fn parse_transform(&self) -> Option<&Transform> {
        self.parse.as_ref()
    }
}

impl fmt::Debug for ExtendedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedType")
            .field("name", &self.name)
            .field("native", &self.native)
            .field("nullable", &self.nullable)
            .field("unique", &self.unique)
            .field("before_insert", &self.before_insert.is_some())
            .field("before_update", &self.before_update.is_some())
            .field("parse", &self.parse.is_some())
            .finish()
    }
}

/// Name → [`ExtendedType`] lookup table.
///
/// Build one at startup, register any custom types, then share it behind an
/// `Arc`; datastores only ever read it.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, ExtendedType>,
}

impl TypeRegistry {
    /// A registry with no types at all, not even the built-ins.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Adds a type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidRegistration`] if the name is empty,
    /// shadows a native type, or is already registered.
    pub fn register(&mut self, ty: ExtendedType) -> Result<(), SchemaError> {
        let reject = |reason: &str| SchemaError::InvalidRegistration {
            name: ty.name.clone(),
            reason: reason.to_string(),
        };
        if ty.name.trim().is_empty() {
            return Err(reject("type name cannot be empty"));
        }
        if NativeType::parse(&ty.name).is_some() {
            return Err(reject("type name shadows a native type"));
        }
        if self.types.contains_key(&ty.name) {
            return Err(reject("type is already registered"));
        }
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExtendedType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TypeRegistry {
    /// A registry holding the built-in types.
    fn default() -> Self {
        let builtins = [
            ExtendedType::new(UUID, NativeType::Text)
                .unique(true)
                .before_insert(uuid_before_insert)
                .before_update(uuid_before_update),
            ExtendedType::new(CREATED_AT, NativeType::Text)
                .before_insert(stamp_on_insert)
                .before_update(reject_on_update)
                .parse(parse_stored_timestamp),
            ExtendedType::new(UPDATED_AT, NativeType::Text)
                .before_insert(stamp_on_insert)
                .before_update(stamp_on_update)
                .parse(parse_stored_timestamp),
            ExtendedType::new(BOOLEAN, NativeType::Integer)
                .before_insert(boolean_to_storage)
                .before_update(boolean_to_storage)
                .parse(parse_stored_boolean),
        ];
        Self {
            types: builtins
                .into_iter()
                .map(|ty| (ty.name.clone(), ty))
                .collect(),
        }
    }
}

fn validate_uuid(value: &Value) -> Result<(), HookError> {
    match value {
        Value::Text(text) if Uuid::parse_str(text).is_ok() => Ok(()),
        Value::Text(text) => Err(HookError::InvalidIdentifier(text.clone())),
        other => Err(HookError::InvalidIdentifier(other.to_string())),
    }
}

/// Generates an identifier only when the column is absent. An explicit
/// `NULL` is kept and left to the column's nullability.
fn uuid_before_insert(column: &str, record: &mut Record) -> Result<(), HookError> {
    match record.get(column) {
        Some(Value::Null) => Ok(()),
        Some(value) => validate_uuid(value),
        None => {
            record.insert(column, Uuid::new_v4().to_string());
            Ok(())
        }
    }
}

fn uuid_before_update(column: &str, record: &mut Record) -> Result<(), HookError> {
    record.supplied(column).map_or(Ok(()), validate_uuid)
}

fn now_text() -> Value {
    Value::Text(format_timestamp(&Utc::now()))
}

fn stamp_on_insert(column: &str, record: &mut Record) -> Result<(), HookError> {
    if record.supplied(column).is_some() {
        return Err(HookError::ReadOnlyColumn(column.to_string()));
    }
    record.insert(column, now_text());
    Ok(())
}

fn reject_on_update(column: &str, record: &mut Record) -> Result<(), HookError> {
    if record.contains(column) {
        return Err(HookError::ReadOnlyColumn(column.to_string()));
    }
    Ok(())
}

fn stamp_on_update(column: &str, record: &mut Record) -> Result<(), HookError> {
    reject_on_update(column, record)?;
    record.insert(column, now_text());
    Ok(())
}

fn parse_stored_timestamp(value: &Value) -> Result<Value, HookError> {
    match value {
        Value::Text(text) => parse_timestamp(text)
            .map(Value::Timestamp)
            .ok_or_else(|| HookError::Custom(format!("invalid stored timestamp '{text}'"))),
        other => Ok(other.clone()),
    }
}

fn boolean_to_storage(column: &str, record: &mut Record) -> Result<(), HookError> {
    let stored = match record.get(column) {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Bool(b)) => Value::Integer(i64::from(*b)),
        Some(value @ Value::Integer(0 | 1)) => value.clone(),
        Some(other) => {
            return Err(HookError::Serialization {
                value: other.clone(),
                message: format!("column '{column}' expects a boolean"),
            });
        }
    };
    record.insert(column, stored);
    Ok(())
}

fn parse_stored_boolean(value: &Value) -> Result<Value, HookError> {
    match value {
        Value::Integer(i) => Ok(Value::Bool(*i != 0)),
        other => Ok(other.clone()),
    }
}
