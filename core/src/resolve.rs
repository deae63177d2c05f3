//! Column resolution.
//!
//! Turns any [`ColumnDecl`] into a canonical [`ColumnDescriptor`]. Plain
//! native columns that carry a default value or a serializer get synthetic
//! hooks, so the write pipelines only ever have one way to transform a value:
//! run the column's hook.

use std::fmt;
use std::sync::Arc;

use crate::registry::{ExtendedType, RecordHook, Transform, TypeRegistry};
use crate::{ColumnDecl, ColumnOptions, HookError, NativeType, Record, SchemaError, Value};

/// Fully resolved column.
#[derive(Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub native: NativeType,
    /// Name of the extended type this column was declared with, if any.
    pub extended: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub auto_increment: bool,
    pub default_value: Option<Value>,
    pub parse: Option<Transform>,
    pub serialize: Option<Transform>,
    pub before_insert: Option<RecordHook>,
    pub before_update: Option<RecordHook>,
}

impl ColumnDescriptor {
    fn native(name: &str, native: NativeType) -> Self {
        Self {
            name: name.to_string(),
            native,
            extended: None,
            nullable: false,
            unique: false,
            auto_increment: false,
            default_value: None,
            parse: None,
            serialize: None,
            before_insert: None,
            before_update: None,
        }
    }

    fn extended(name: &str, ty: &ExtendedType) -> Self {
        Self {
            name: name.to_string(),
            native: ty.native(),
            extended: Some(ty.name().to_string()),
            nullable: ty.is_nullable(),
            unique: ty.is_unique(),
            auto_increment: false,
            default_value: None,
            parse: ty.parse_transform().cloned(),
            serialize: None,
            before_insert: ty.before_insert_hook().cloned(),
            before_update: ty.before_update_hook().cloned(),
        }
    }

    /// Applies the parse transform to a stored value. `NULL` is never parsed.
    pub fn parse_value(&self, value: &Value) -> Result<Value, HookError> {
        match (&self.parse, value) {
            (Some(parse), v) if !v.is_null() => parse(v),
            _ => Ok(value.clone()),
        }
    }
}

fn same_transform(a: &Option<Transform>, b: &Option<Transform>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Transforms compare by identity; hooks compare by presence, because
/// synthetic hooks are rebuilt on every resolution.
impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.native == other.native
            && self.extended == other.extended
            && self.nullable == other.nullable
            && self.unique == other.unique
            && self.auto_increment == other.auto_increment
            && self.default_value == other.default_value
            && same_transform(&self.parse, &other.parse)
            && same_transform(&self.serialize, &other.serialize)
            && self.before_insert.is_some() == other.before_insert.is_some()
            && self.before_update.is_some() == other.before_update.is_some()
    }
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("name", &self.name)
            .field("native", &self.native)
            .field("extended", &self.extended)
            .field("nullable", &self.nullable)
            .field("unique", &self.unique)
            .field("auto_increment", &self.auto_increment)
            .field("default_value", &self.default_value)
            .field("parse", &self.parse.is_some())
            .field("serialize", &self.serialize.is_some())
            .field("before_insert", &self.before_insert.is_some())
            .field("before_update", &self.before_update.is_some())
            .finish()
    }
}

/// Resolves one column declaration against the registry.
///
/// - A bare native type gives a non-nullable, non-unique column with no hooks.
/// - A bare extended type inherits everything from its registration.
/// - A detailed native declaration keeps its own options; a before-insert
///   hook is synthesized when it has a default value or a serializer, and a
///   before-update hook when it has a serializer.
/// - A detailed extended declaration uses the registration's storage type
///   and hooks; only `nullable`, `unique` and `auto_increment` may be set
///   on the declaration.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidType`] when the type name is neither native
/// nor registered, and [`SchemaError::UnsupportedOption`] when a detailed
/// extended declaration sets `defaultValue`, `parse` or `serialize`, which
/// its type's hooks own.
///
/// # Examples
///
/// ```
/// use schemastore_core::{resolve_column, ColumnDecl, ColumnOptions, NativeType, TypeRegistry};
///
/// let registry = TypeRegistry::default();
/// let column = resolve_column("people", "uid", &ColumnDecl::from("UUID"), &registry).unwrap();
/// assert_eq!(column.native, NativeType::Text);
/// assert!(column.unique);
/// assert!(column.before_insert.is_some());
///
/// assert!(resolve_column("people", "x", &ColumnDecl::from("VARCHAR"), &registry).is_err());
///
/// let decl = ColumnOptions::new("BOOLEAN").default_value(true).into();
/// assert!(resolve_column("people", "active", &decl, &registry).is_err());
/// ```
pub fn resolve_column(
    table: &str,
    name: &str,
    decl: &ColumnDecl,
    registry: &TypeRegistry,
) -> Result<ColumnDescriptor, SchemaError> {
    match decl {
        ColumnDecl::Type(type_name) => {
            if let Some(native) = NativeType::parse(type_name) {
                return Ok(ColumnDescriptor::native(name, native));
            }
            registry
                .get(type_name)
                .map(|ty| ColumnDescriptor::extended(name, ty))
                .ok_or_else(|| invalid_type(name, type_name))
        }
        ColumnDecl::Detailed(options) => resolve_detailed(table, name, options, registry),
    }
}

fn resolve_detailed(
    table: &str,
    name: &str,
    options: &ColumnOptions,
    registry: &TypeRegistry,
) -> Result<ColumnDescriptor, SchemaError> {
    if let Some(native) = NativeType::parse(&options.type_name) {
        let needs_insert_hook = options.default_value.is_some() || options.serialize.is_some();
        return Ok(ColumnDescriptor {
            nullable: options.nullable.unwrap_or(false),
            unique: options.unique.unwrap_or(false),
            auto_increment: options.auto_increment,
            default_value: options.default_value.clone(),
            parse: options.parse.clone(),
            serialize: options.serialize.clone(),
            before_insert: needs_insert_hook
                .then(|| default_and_serialize_hook(options.default_value.clone(), options.serialize.clone())),
            before_update: options.serialize.clone().map(serialize_hook),
            ..ColumnDescriptor::native(name, native)
        });
    }

    let ty = registry
        .get(&options.type_name)
        .ok_or_else(|| invalid_type(name, &options.type_name))?;
    let owned_by_type = [
        ("defaultValue", options.default_value.is_some()),
        ("parse", options.parse.is_some()),
        ("serialize", options.serialize.is_some()),
    ];
    if let Some((option, _)) = owned_by_type.into_iter().find(|(_, set)| *set) {
        return Err(SchemaError::UnsupportedOption {
            table: table.to_string(),
            column: name.to_string(),
            type_name: options.type_name.clone(),
            option,
        });
    }
    let mut column = ColumnDescriptor::extended(name, ty);
    if let Some(nullable) = options.nullable {
        column.nullable = nullable;
    }
    if let Some(unique) = options.unique {
        column.unique = unique;
    }
    column.auto_increment = options.auto_increment;
    Ok(column)
}

fn invalid_type(column: &str, type_name: &str) -> SchemaError {
    SchemaError::InvalidType {
        column: column.to_string(),
        type_name: type_name.to_string(),
    }
}

/// Serializes the column's value in place when one was supplied.
fn serialize_in_place(column: &str, record: &mut Record, serialize: &Transform) -> Result<(), HookError> {
    if let Some(value) = record.supplied(column) {
        let stored = serialize(value)?;
        record.insert(column, stored);
    }
    Ok(())
}

fn default_and_serialize_hook(default: Option<Value>, serialize: Option<Transform>) -> RecordHook {
    Arc::new(move |column: &str, record: &mut Record| {
        if let Some(default) = &default {
            if !record.contains(column) {
                record.insert(column, default.clone());
            }
        }
        match &serialize {
            Some(serialize) => serialize_in_place(column, record, serialize),
            None => Ok(()),
        }
    })
}

fn serialize_hook(serialize: Transform) -> RecordHook {
    Arc::new(move |column: &str, record: &mut Record| serialize_in_place(column, record, &serialize))
}
