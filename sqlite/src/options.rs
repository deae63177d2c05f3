//! Canonical option shapes for datastore operations.
//!
//! The facade's convenience methods all collapse into these before any work
//! is done. Every shape deserializes from JSON/YAML, using the field names
//! `records`, `returnIds`, `where`, `set` and `all`.

use schemastore_core::{Criteria, Record};
use serde::{Deserialize, Serialize};

use crate::error::{DatastoreError, Result};

/// One record or many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Records {
    One(Record),
    Many(Vec<Record>),
}

impl Records {
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Records::One(record) => vec![record],
            Records::Many(records) => records,
        }
    }
}

impl Default for Records {
    fn default() -> Self {
        Records::Many(Vec::new())
    }
}

impl From<Record> for Records {
    fn from(record: Record) -> Self {
        Records::One(record)
    }
}

impl From<Vec<Record>> for Records {
    fn from(records: Vec<Record>) -> Self {
        Records::Many(records)
    }
}

impl<const N: usize> From<[Record; N]> for Records {
    fn from(records: [Record; N]) -> Self {
        Records::Many(records.into())
    }
}

/// Options for an insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOptions {
    pub table: String,
    pub records: Records,
    /// Report generated row ids even when the table has no
    /// auto-increment column.
    #[serde(default)]
    pub return_ids: bool,
}

impl InsertOptions {
    pub fn new(table: impl Into<String>, records: impl Into<Records>) -> Self {
        Self {
            table: table.into(),
            records: records.into(),
            return_ids: false,
        }
    }

    pub fn return_ids(mut self) -> Self {
        self.return_ids = true;
        self
    }
}

/// Outcome of an insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResult {
    pub count: usize,
    /// Generated row ids in execution order, present when the table has an
    /// auto-increment column or ids were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<i64>>,
}

/// Options for a select or a count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectOptions {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Criteria>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(criteria: Criteria) -> Self {
        Self {
            filter: Some(criteria),
        }
    }
}

impl From<Criteria> for SelectOptions {
    fn from(criteria: Criteria) -> Self {
        Self::filter(criteria)
    }
}

impl From<Option<Criteria>> for SelectOptions {
    fn from(filter: Option<Criteria>) -> Self {
        Self { filter }
    }
}

/// Options for an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOptions {
    pub set: Record,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Criteria>,
}

impl UpdateOptions {
    pub fn new(set: Record) -> Self {
        Self { set, filter: None }
    }

    pub fn filter(mut self, criteria: Criteria) -> Self {
        self.filter = Some(criteria);
        self
    }
}

/// Options for a delete, as supplied by the caller.
///
/// Exactly one of `all` and `where` must be given; see
/// [`DeleteOptions::scope`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteOptions {
    #[serde(default)]
    pub all: bool,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Criteria>,
}

/// What a delete is allowed to touch.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteScope {
    All,
    Where(Criteria),
}

impl DeleteOptions {
    /// Deletes every row.
    pub fn all() -> Self {
        Self {
            all: true,
            filter: None,
        }
    }

    /// Deletes the rows matching `criteria`. Empty criteria match every row.
    pub fn filter(criteria: Criteria) -> Self {
        Self {
            all: false,
            filter: Some(criteria),
        }
    }

    /// Validates the options into a scope.
    ///
    /// # Errors
    ///
    /// [`DatastoreError::MissingDeleteScope`] when neither `all` nor `where`
    /// is given, [`DatastoreError::AmbiguousDeleteScope`] when both are.
    pub fn scope(self, table: &str) -> Result<DeleteScope> {
        match (self.all, self.filter) {
            (true, None) => Ok(DeleteScope::All),
            (false, Some(criteria)) => Ok(DeleteScope::Where(criteria)),
            (false, None) => Err(DatastoreError::MissingDeleteScope(table.to_string())),
            (true, Some(_)) => Err(DatastoreError::AmbiguousDeleteScope(table.to_string())),
        }
    }
}

impl From<DeleteScope> for DeleteOptions {
    fn from(scope: DeleteScope) -> Self {
        match scope {
            DeleteScope::All => DeleteOptions::all(),
            DeleteScope::Where(criteria) => DeleteOptions::filter(criteria),
        }
    }
}

impl From<Criteria> for DeleteOptions {
    fn from(criteria: Criteria) -> Self {
        DeleteOptions::filter(criteria)
    }
}
