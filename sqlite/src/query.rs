//! Insert, update, select, count and delete pipelines for one table.
//!
//! [`TableQuery`] is the synchronous core behind
//! [`Datastore`](crate::Datastore). It turns canonical options into
//! parameterized SQL, runs column hooks on the way in and parse transforms
//! on the way out, and classifies engine errors.
//!
//! # Example
//!
//! ```
//! use rusqlite::Connection;
//! use schemastore_core::{ColumnOptions, Criteria, Record, TableDescriptor, TableSpec, TypeRegistry};
//! use schemastore_sqlite::{TableQuery, generate_create_table_sql};
//!
//! let spec = TableSpec::new()
//!     .column("id", ColumnOptions::new("INTEGER").auto_increment())
//!     .column("name", "TEXT");
//! let table = TableDescriptor::resolve("people", &spec, &TypeRegistry::default()).unwrap();
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch(&generate_create_table_sql(&table)).unwrap();
//!
//! let query = TableQuery::new(&conn, &table);
//! let result = query.insert(vec![Record::new().with("name", "foo")], false).unwrap();
//! assert_eq!(result.ids, Some(vec![1]));
//!
//! let rows = query.select(Some(&Criteria::new().eq("name", "foo"))).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use schemastore_core::{ColumnDescriptor, Criteria, Record, TableDescriptor, Value};
use tracing::{debug, warn};

use crate::convert::{read_row, to_params, to_sql};
use crate::criteria::compile_where;
use crate::error::{DatastoreError, Pipeline, Result};
use crate::options::{DeleteScope, InsertResult};
use crate::schema::quote_identifier;

/// Runs the data pipelines against one resolved table.
pub struct TableQuery<'a> {
    conn: &'a Connection,
    table: &'a TableDescriptor,
}

impl<'a> TableQuery<'a> {
    pub fn new(conn: &'a Connection, table: &'a TableDescriptor) -> Self {
        Self { conn, table }
    }

    pub fn table(&self) -> &TableDescriptor {
        self.table
    }

    /// Inserts records, one execution per record on a single prepared
    /// statement.
    ///
    /// Records may name different column subsets. The statement's column
    /// list is, in declaration order, every column with a before-insert
    /// hook, every non-nullable column other than the integer row-id key,
    /// and every column any record names. Columns a record leaves out bind
    /// `NULL` unless a hook fills them in.
    ///
    /// Rows inserted before a failing record stay committed; no transaction
    /// wraps the batch.
    ///
    /// # Errors
    ///
    /// - [`DatastoreError::InsertError`] if a record names an unknown column or
    ///   writes a hook-owned column.
    /// - [`DatastoreError::InvalidIdentifier`] / [`DatastoreError::SerializationError`]
    ///   when a hook rejects a value.
    /// - Any adapted engine error, such as
    ///   [`DatastoreError::UniqueConstraintViolation`].
    pub fn insert(&self, records: Vec<Record>, return_ids: bool) -> Result<InsertResult> {
        let name = self.table.name();
        for record in &records {
            if let Some(unknown) = record.keys().find(|k| !self.table.has_column(k)) {
                return Err(DatastoreError::InsertError {
                    table: name.to_string(),
                    message: format!("unknown column '{unknown}' in table '{name}'"),
                });
            }
        }

        let want_ids = return_ids || self.table.has_auto_increment();
        let mut result = InsertResult {
            count: 0,
            ids: want_ids.then(Vec::new),
        };
        if records.is_empty() {
            return Ok(result);
        }

        let columns = self.insert_columns(&records);
        let sql = insert_sql(name, &columns);
        debug!(table = name, sql = %sql, records = records.len(), "executing insert");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| DatastoreError::from_engine(e, &sql))?;

        for record in records {
            let outcome = self.prepare_insert(record, &columns).and_then(|params| {
                stmt.execute(params_from_iter(params))
                    .map_err(|e| DatastoreError::from_engine(e, &sql))
            });
            if let Err(err) = outcome {
                if result.count > 0 {
                    warn!(
                        table = name,
                        inserted = result.count,
                        error = %err,
                        "insert aborted after partial success; earlier rows remain committed"
                    );
                }
                return Err(err);
            }

            result.count += 1;
            if let Some(ids) = result.ids.as_mut() {
                let id = self.conn.last_insert_rowid();
                if id > 0 {
                    ids.push(id);
                }
            }
        }

        Ok(result)
    }

    fn insert_columns(&self, records: &[Record]) -> Vec<&'a ColumnDescriptor> {
        let rowid = self.table.rowid_column().map(|c| c.name.as_str());
        self.table
            .columns()
            .iter()
            .filter(|c| {
                c.before_insert.is_some()
                    || (!c.nullable && rowid != Some(c.name.as_str()))
                    || records.iter().any(|r| r.contains(&c.name))
            })
            .collect()
    }

    /// Builds the working copy for one record, runs the insert hooks, and
    /// returns the parameters in column-list order.
    fn prepare_insert(&self, record: Record, columns: &[&ColumnDescriptor]) -> Result<Vec<SqlValue>> {
        let mut working: Record = record
            .into_iter()
            .filter(|(k, _)| columns.iter().any(|c| &c.name == k))
            .collect();

        for (column, hook) in self.table.insert_hooks() {
            hook(column, &mut working)
                .map_err(|e| DatastoreError::from_hook(e, Pipeline::Insert, self.table.name()))?;
        }

        Ok(columns
            .iter()
            .map(|c| working.get(&c.name).map_or(SqlValue::Null, to_sql))
            .collect())
    }

    /// Updates the rows matching `filter`, or every row when it is `None`.
    ///
    /// Every before-update hook of the table runs against a copy of `set`,
    /// in declaration order, whether or not its column was named. Hooks may
    /// add values (an `UPDATED_AT` stamp) or reject them. `SET` parameters
    /// bind before `WHERE` parameters.
    ///
    /// # Errors
    ///
    /// - [`DatastoreError::UpdateError`] for unknown columns, hook-owned columns,
    ///   or when nothing is left to set.
    /// - Hook rejections and adapted engine errors as for inserts.
    pub fn update(&self, set: &Record, filter: Option<&Criteria>) -> Result<usize> {
        let name = self.table.name();
        let update_error = |message: String| DatastoreError::UpdateError {
            table: name.to_string(),
            message,
        };

        if let Some(unknown) = set.keys().find(|k| !self.table.has_column(k)) {
            return Err(update_error(format!("unknown column '{unknown}' in table '{name}'")));
        }

        let mut working = set.clone();
        for (column, hook) in self.table.update_hooks() {
            hook(column, &mut working).map_err(|e| DatastoreError::from_hook(e, Pipeline::Update, name))?;
        }
        if working.is_empty() {
            return Err(update_error("no columns to update".to_string()));
        }

        let assignments: Vec<String> = working
            .keys()
            .map(|column| format!("{} = ?", quote_identifier(column)))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", quote_identifier(name), assignments.join(", "));
        let clause = compile_where(filter)?;
        clause.append_to(&mut sql);

        let mut params: Vec<Value> = working.into_iter().map(|(_, v)| v).collect();
        params.extend(clause.params);
        self.execute(&sql, &params)
    }

    /// Selects the rows matching `filter`, applying each column's parse
    /// transform to non-null values.
    ///
    /// # Errors
    ///
    /// [`DatastoreError::ConversionError`] if a parse transform rejects a
    /// stored value, or any adapted engine error.
    pub fn select(&self, filter: Option<&Criteria>) -> Result<Vec<Record>> {
        let mut sql = format!("SELECT * FROM {}", quote_identifier(self.table.name()));
        let clause = compile_where(filter)?;
        clause.append_to(&mut sql);
        debug!(table = self.table.name(), sql = %sql, params = clause.params.len(), "executing select");

        let adapt = |e| DatastoreError::from_engine(e, &sql);
        let mut stmt = self.conn.prepare(&sql).map_err(adapt)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(to_params(&clause.params))).map_err(adapt)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(adapt)? {
            let mut record = read_row(row, &columns)?;
            self.parse_record(&mut record)?;
            records.push(record);
        }
        Ok(records)
    }

    fn parse_record(&self, record: &mut Record) -> Result<()> {
        for column in self.table.columns().iter().filter(|c| c.parse.is_some()) {
            let Some(raw) = record.get(&column.name) else {
                continue;
            };
            let parsed = column.parse_value(raw).map_err(|e| {
                DatastoreError::ConversionError(format!(
                    "column '{}' of table '{}': {e}",
                    column.name,
                    self.table.name()
                ))
            })?;
            record.insert(column.name.as_str(), parsed);
        }
        Ok(())
    }

    /// Counts the rows matching `filter`.
    pub fn count(&self, filter: Option<&Criteria>) -> Result<usize> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(self.table.name()));
        let clause = compile_where(filter)?;
        clause.append_to(&mut sql);
        debug!(table = self.table.name(), sql = %sql, params = clause.params.len(), "executing count");

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(to_params(&clause.params)), |row| row.get(0))
            .map_err(|e| DatastoreError::from_engine(e, &sql))?;
        Ok(count as usize)
    }

    /// Deletes the rows in scope.
    pub fn delete(&self, scope: &DeleteScope) -> Result<usize> {
        let mut sql = format!("DELETE FROM {}", quote_identifier(self.table.name()));
        let clause = match scope {
            DeleteScope::All => compile_where(None)?,
            DeleteScope::Where(criteria) => compile_where(Some(criteria))?,
        };
        clause.append_to(&mut sql);
        self.execute(&sql, &clause.params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(table = self.table.name(), sql = %sql, params = params.len(), "executing statement");
        self.conn
            .execute(sql, params_from_iter(to_params(params)))
            .map_err(|e| DatastoreError::from_engine(e, sql))
    }
}

fn insert_sql(table: &str, columns: &[&ColumnDescriptor]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table));
    }
    let names: Vec<String> = columns.iter().map(|c| quote_identifier(&c.name)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_identifier(table),
        names.join(", ")
    )
}
