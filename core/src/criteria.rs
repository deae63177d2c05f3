//! Declarative row filters.
//!
//! [`Criteria`] maps column names to a [`Condition`]. Entries are combined
//! with `AND`, in insertion order. The SQL backend compiles them into a
//! parameterized `WHERE` clause.
//!
//! Deserialization follows the value's shape: an array is a membership
//! test, an object is a set of [`Operators`], anything else is an equality
//! test (`null` meaning `IS NULL`). An array always wins over an object
//! reading.
//!
//! ```
//! use schemastore_core::{Condition, Criteria, Operators};
//!
//! let criteria: Criteria = serde_json::from_str(
//!     r#"{"name": ["foo", "bar"], "age": {"gte": 18, "lt": 65}, "deleted": null}"#,
//! ).unwrap();
//! assert!(matches!(criteria.get("name"), Some(Condition::In(values)) if values.len() == 2));
//! assert!(matches!(criteria.get("age"), Some(Condition::Ops(_))));
//!
//! let built = Criteria::new().any_of("name", ["foo", "bar"]).gte("age", 18).lt("age", 65);
//! assert_eq!(built.len(), 2);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::Value;

/// Comparison operator inside an [`Operators`] object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl Operator {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
        }
    }
}

/// Operator object. Every operator present produces its own fragment.
///
/// A key given as `null` is kept as [`Value::Null`], so `{"eq": null}` is
/// an `IS NULL` test rather than no test at all. Unrecognized keys are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operators {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub eq: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub neq: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub like: Option<Value>,
}

/// Maps a present key to `Some`, including an explicit `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one operator's operand, replacing any previous one.
    pub fn with(mut self, op: Operator, operand: impl Into<Value>) -> Self {
        let slot = match op {
            Operator::Eq => &mut self.eq,
            Operator::Neq => &mut self.neq,
            Operator::Gt => &mut self.gt,
            Operator::Gte => &mut self.gte,
            Operator::Lt => &mut self.lt,
            Operator::Lte => &mut self.lte,
            Operator::Like => &mut self.like,
        };
        *slot = Some(operand.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Present operators in fixed order: eq, neq, gt, gte, lt, lte, like.
    pub fn iter(&self) -> impl Iterator<Item = (Operator, &Value)> {
        [
            (Operator::Eq, &self.eq),
            (Operator::Neq, &self.neq),
            (Operator::Gt, &self.gt),
            (Operator::Gte, &self.gte),
            (Operator::Lt, &self.lt),
            (Operator::Lte, &self.lte),
            (Operator::Like, &self.like),
        ]
        .into_iter()
        .filter_map(|(op, operand)| operand.as_ref().map(|v| (op, v)))
    }
}

/// Filter on a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Membership: `col IN (...)`.
    In(Vec<Value>),
    /// One fragment per operator present.
    Ops(Operators),
    /// Equality, or `IS NULL` for [`Value::Null`].
    Value(Value),
}

/// Column name → [`Condition`], in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria(IndexMap<String, Condition>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the condition for a column, replacing any previous one.
    pub fn condition(mut self, column: impl Into<String>, condition: Condition) -> Self {
        self.0.insert(column.into(), condition);
        self
    }

    /// `column = value`, or `column IS NULL` when `value` is null.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(column, Condition::Value(value.into()))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.condition(column, Condition::Value(Value::Null))
    }

    pub fn any_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.condition(column, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    /// Adds an operator to the column's operator object, creating it if
    /// needed. A non-operator condition on the column is replaced.
    pub fn op(mut self, column: impl Into<String>, op: Operator, operand: impl Into<Value>) -> Self {
        let condition = self
            .0
            .entry(column.into())
            .or_insert_with(|| Condition::Ops(Operators::new()));
        let ops = match std::mem::replace(condition, Condition::Ops(Operators::new())) {
            Condition::Ops(ops) => ops,
            _ => Operators::new(),
        };
        *condition = Condition::Ops(ops.with(op, operand));
        self
    }

    pub fn neq(self, column: impl Into<String>, operand: impl Into<Value>) -> Self {
        self.op(column, Operator::Neq, operand)
    }

    pub fn gt(self, column: impl Into<String>, operand: impl Into<Value>) -> Self {
        self.op(column, Operator::Gt, operand)
    }

    pub fn gte(self, column: impl Into<String>, operand: impl Into<Value>) -> Self {
        self.op(column, Operator::Gte, operand)
    }

    pub fn lt(self, column: impl Into<String>, operand: impl Into<Value>) -> Self {
        self.op(column, Operator::Lt, operand)
    }

    pub fn lte(self, column: impl Into<String>, operand: impl Into<Value>) -> Self {
        self.op(column, Operator::Lte, operand)
    }

    pub fn like(self, column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.op(column, Operator::Like, pattern)
    }

    pub fn get(&self, column: &str) -> Option<&Condition> {
        self.0.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
