//! Declarative schema model.
//!
//! These are the raw, pre-resolution shapes a caller writes: a [`Schema`]
//! maps table names to [`TableSpec`]s, and each table maps column names to
//! a [`ColumnDecl`]. Nothing here is validated; type names are only checked
//! when the schema is resolved (see [`TableDescriptor`](crate::TableDescriptor)).
//!
//! All types deserialize from JSON/YAML, so a schema can live in a file:
//!
//! ```
//! use schemastore_core::{ColumnDecl, Schema};
//!
//! let schema = Schema::from_json_str(r#"{
//!     "people": {
//!         "columns": {
//!             "id": { "type": "INTEGER", "autoIncrement": true },
//!             "name": "TEXT",
//!             "birthdate": { "type": "TEXT", "nullable": true }
//!         }
//!     }
//! }"#).unwrap();
//! assert_eq!(schema.table_names().collect::<Vec<_>>(), ["people"]);
//! let id = schema.get("people").and_then(|t| t.columns.get("id"));
//! assert!(matches!(id, Some(ColumnDecl::Detailed(options)) if options.auto_increment));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::registry::Transform;
use crate::{HookError, Value};

/// The four storage classes the engine supports directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NativeType {
    Text,
    Blob,
    Integer,
    Real,
}

impl NativeType {
    /// All native types, in declaration order.
    pub const ALL: [NativeType; 4] = [
        NativeType::Text,
        NativeType::Blob,
        NativeType::Integer,
        NativeType::Real,
    ];

    /// The SQL keyword for this type.
    pub const fn as_sql(self) -> &'static str {
        match self {
            NativeType::Text => "TEXT",
            NativeType::Blob => "BLOB",
            NativeType::Integer => "INTEGER",
            NativeType::Real => "REAL",
        }
    }

    /// Parses a native type name, ignoring ASCII case.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemastore_core::NativeType;
    ///
    /// assert_eq!(NativeType::parse("integer"), Some(NativeType::Integer));
    /// assert_eq!(NativeType::parse("UUID"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_sql().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Detailed column declaration.
///
/// `type` names either a native type or a registered extended type. The
/// `parse`/`serialize` transforms can only be attached in code; they are
/// skipped by serde.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ColumnOptions {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, rename = "defaultValue", alias = "default_value", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, rename = "autoIncrement", alias = "auto_increment", skip_serializing_if = "std::ops::Not::not")]
    pub auto_increment: bool,
    #[serde(skip)]
    pub parse: Option<Transform>,
    #[serde(skip)]
    pub serialize: Option<Transform>,
}

impl ColumnOptions {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Attaches a read-time transform applied to every non-null stored value.
    pub fn parse<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(f));
        self
    }

    /// Attaches a write-time transform applied before insert and update.
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ColumnOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnOptions")
            .field("type_name", &self.type_name)
            .field("nullable", &self.nullable)
            .field("unique", &self.unique)
            .field("default_value", &self.default_value)
            .field("auto_increment", &self.auto_increment)
            .field("parse", &self.parse.is_some())
            .field("serialize", &self.serialize.is_some())
            .finish()
    }
}

/// A raw column declaration: a bare type name or a detailed object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnDecl {
    Type(String),
    Detailed(ColumnOptions),
}

impl From<&str> for ColumnDecl {
    fn from(type_name: &str) -> Self {
        ColumnDecl::Type(type_name.to_string())
    }
}

impl From<String> for ColumnDecl {
    fn from(type_name: String) -> Self {
        ColumnDecl::Type(type_name)
    }
}

impl From<NativeType> for ColumnDecl {
    fn from(native: NativeType) -> Self {
        ColumnDecl::Type(native.as_sql().to_string())
    }
}

impl From<ColumnOptions> for ColumnDecl {
    fn from(options: ColumnOptions) -> Self {
        ColumnDecl::Detailed(options)
    }
}

/// Explicit primary key: one column or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(c) => vec![c.as_str()],
            PrimaryKey::Composite(cs) => cs.iter().map(String::as_str).collect(),
        }
    }
}

/// Raw table declaration.
///
/// When `primary_key` is omitted, a column literally named `id` becomes the
/// primary key; without one the table has no primary key.
///
/// # Examples
///
/// ```
/// use schemastore_core::{ColumnOptions, TableSpec};
///
/// let people = TableSpec::new()
///     .column("id", ColumnOptions::new("INTEGER").auto_increment())
///     .column("name", "TEXT")
///     .column("birthdate", ColumnOptions::new("TEXT").nullable());
/// assert_eq!(people.columns.len(), 3);
/// assert!(people.primary_key.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSpec {
    pub columns: IndexMap<String, ColumnDecl>,
    #[serde(default, rename = "primaryKey", alias = "primary_key", skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
}

impl TableSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, decl: impl Into<ColumnDecl>) -> Self {
        self.columns.insert(name.into(), decl.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(PrimaryKey::Single(column.into()));
        self
    }

    pub fn composite_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(PrimaryKey::Composite(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }
}

/// Table name → [`TableSpec`], in declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    tables: IndexMap<String, TableSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table declaration.
    pub fn table(mut self, name: impl Into<String>, spec: TableSpec) -> Self {
        self.tables.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableSpec)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parses a schema document from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
