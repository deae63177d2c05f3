//! Compiles [`Criteria`] into a parameterized `WHERE` clause.
//!
//! Placeholders are positional (`?`) and line up one-to-one with
//! [`WhereClause::params`] in emission order. Callers that bind other
//! parameters first (the `SET` list of an update) append these after theirs.

use schemastore_core::{Condition, Criteria, Operator, Value};

use crate::error::{DatastoreError, Result};
use crate::schema::quote_identifier;

/// A compiled `WHERE` clause. Empty when there is nothing to filter on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    /// Conjoined fragments, without the `WHERE` keyword.
    pub sql: String,
    pub params: Vec<Value>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Appends ` WHERE ...` to `sql` unless the clause is empty.
    pub fn append_to(&self, sql: &mut String) {
        if !self.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.sql);
        }
    }
}

/// Compiles criteria into a clause, entries in insertion order joined by `AND`.
///
/// | condition              | fragment              | params          |
/// |------------------------|-----------------------|-----------------|
/// | `null`                 | `("c" IS NULL)`       | none            |
/// | scalar                 | `("c" = ?)`           | the scalar      |
/// | array                  | `("c" IN (?, ?))`     | each element    |
/// | `{ "gte": 1, "lt": 9 }`| `("c" >= ?) AND ("c" < ?)` | each operand |
///
/// An empty array compiles to `(0)`, which matches nothing. Inside an
/// operator object, `eq`/`neq` against `null` compile to `IS NULL` /
/// `IS NOT NULL`.
///
/// # Errors
///
/// [`DatastoreError::InvalidCriteria`] when an operator object carries no
/// operator, since it would otherwise drop the column from the filter.
///
/// # Examples
///
/// ```
/// use schemastore_core::{Criteria, Value};
/// use schemastore_sqlite::compile_where;
///
/// let criteria = Criteria::new().any_of("name", ["foo", "bar"]).is_null("birthdate");
/// let clause = compile_where(Some(&criteria)).unwrap();
/// assert_eq!(clause.sql, r#"("name" IN (?, ?)) AND ("birthdate" IS NULL)"#);
/// assert_eq!(clause.params, [Value::from("foo"), Value::from("bar")]);
///
/// assert!(compile_where(None).unwrap().is_empty());
/// ```
pub fn compile_where(criteria: Option<&Criteria>) -> Result<WhereClause> {
    let Some(criteria) = criteria else {
        return Ok(WhereClause::default());
    };

    let mut fragments = Vec::with_capacity(criteria.len());
    let mut params = Vec::new();

    for (column, condition) in criteria.iter() {
        let col = quote_identifier(column);
        match condition {
            Condition::Value(Value::Null) => fragments.push(format!("({col} IS NULL)")),
            Condition::Value(value) => {
                fragments.push(format!("({col} = ?)"));
                params.push(value.clone());
            }
            Condition::In(values) if values.is_empty() => fragments.push("(0)".to_string()),
            Condition::In(values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                fragments.push(format!("({col} IN ({placeholders}))"));
                params.extend(values.iter().cloned());
            }
            Condition::Ops(ops) if ops.is_empty() => {
                return Err(DatastoreError::InvalidCriteria(format!(
                    "operator object for column '{column}' has no operators"
                )));
            }
            Condition::Ops(ops) => {
                for (op, operand) in ops.iter() {
                    match (op, operand) {
                        (Operator::Eq, Value::Null) => fragments.push(format!("({col} IS NULL)")),
                        (Operator::Neq, Value::Null) => fragments.push(format!("({col} IS NOT NULL)")),
                        _ => {
                            fragments.push(format!("({col} {} ?)", op.as_sql()));
                            params.push(operand.clone());
                        }
                    }
                }
            }
        }
    }

    Ok(WhereClause {
        sql: fragments.join(" AND "),
        params,
    })
}
