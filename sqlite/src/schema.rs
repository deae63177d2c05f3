//! `CREATE TABLE` generation from resolved table descriptors.
//!
//! One statement per table, one column clause per declared column, in
//! declaration order:
//!
//! ```text
//! CREATE TABLE IF NOT EXISTS "people" (
//!     "id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL UNIQUE,
//!     "name" TEXT NOT NULL,
//!     "birthdate" TEXT
//! );
//! ```
//!
//! A single-column primary key is marked on its column. A composite key is
//! emitted as a table-level `PRIMARY KEY (...)` constraint, since the
//! engine accepts at most one column-level `PRIMARY KEY`. Statements use
//! `IF NOT EXISTS`, so issuing them again is a no-op.

use schemastore_core::{ColumnDescriptor, ResolvedSchema, TableDescriptor, TableSpec, TypeRegistry};

use crate::error::Result;

/// Quotes an identifier, doubling any embedded quote characters.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_clause(table: &TableDescriptor, column: &ColumnDescriptor) -> String {
    let mut clause = format!("{} {}", quote_identifier(&column.name), column.native.as_sql());
    if table.primary_key().len() == 1 && table.is_primary_key(&column.name) {
        clause.push_str(" PRIMARY KEY");
    }
    if column.auto_increment {
        clause.push_str(" AUTOINCREMENT");
    }
    if !column.nullable {
        clause.push_str(" NOT NULL");
    }
    if column.unique || column.auto_increment {
        clause.push_str(" UNIQUE");
    }
    clause
}

/// Generates the `CREATE TABLE IF NOT EXISTS` statement for a resolved table.
pub fn generate_create_table_sql(table: &TableDescriptor) -> String {
    let mut clauses: Vec<String> = table
        .columns()
        .iter()
        .map(|column| column_clause(table, column))
        .collect();

    if table.primary_key().len() > 1 {
        let keys: Vec<String> = table.primary_key().iter().map(|k| quote_identifier(k)).collect();
        clauses.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
        quote_identifier(table.name()),
        clauses.join(",\n    ")
    )
}

/// Resolves a raw table declaration and generates its statement.
///
/// # Errors
///
/// Returns [`DatastoreError::InvalidSchema`](crate::DatastoreError::InvalidSchema)
/// if a column type is unknown, the primary key names an undeclared column,
/// or an auto-increment column is not the table's sole INTEGER primary key.
///
/// # Examples
///
/// ```
/// use schemastore_core::{ColumnOptions, TableSpec, TypeRegistry};
/// use schemastore_sqlite::generate_table_sql;
///
/// let spec = TableSpec::new()
///     .column("id", ColumnOptions::new("INTEGER").auto_increment())
///     .column("name", "TEXT");
/// let sql = generate_table_sql("people", &spec, &TypeRegistry::default()).unwrap();
/// assert!(sql.contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL UNIQUE"#));
///
/// let bad = TableSpec::new().column("seq", ColumnOptions::new("INTEGER").auto_increment())
///     .column("name", "TEXT")
///     .primary_key("name");
/// assert!(generate_table_sql("people", &bad, &TypeRegistry::default()).is_err());
/// ```
pub fn generate_table_sql(name: &str, spec: &TableSpec, registry: &TypeRegistry) -> Result<String> {
    let table = TableDescriptor::resolve(name, spec, registry)?;
    Ok(generate_create_table_sql(&table))
}

/// Generates the statements for every table, in declaration order.
pub fn generate_schema_sql(schema: &ResolvedSchema) -> String {
    schema
        .tables()
        .map(generate_create_table_sql)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use schemastore_core::registry::{UPDATED_AT, UUID};
    use schemastore_core::{ColumnOptions, Schema};

    use super::*;
    use crate::DatastoreError;

    fn resolve(spec: &TableSpec) -> TableDescriptor {
        TableDescriptor::resolve("people", spec, &TypeRegistry::default()).unwrap()
    }

    fn people() -> TableSpec {
        TableSpec::new()
            .column("id", ColumnOptions::new("INTEGER").auto_increment())
            .column("name", "TEXT")
            .column("birthdate", ColumnOptions::new("TEXT").nullable())
    }

    /// `(name, type, notnull, pk)` rows from `PRAGMA table_info`.
    fn table_info(conn: &Connection, table: &str) -> Vec<(String, String, bool, i64)> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table))).unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(1)?, row.get(2)?, row.get(3)?, row.get(5)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        rows
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("name"), "\"name\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_column_clauses() {
        let sql = generate_create_table_sql(&resolve(&people()));
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"people\" ("));
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL UNIQUE,"));
        assert!(sql.contains("\"name\" TEXT NOT NULL,"));
        assert!(sql.contains("\"birthdate\" TEXT\n"));
    }

    #[test]
    fn test_implicit_id_is_only_primary_key() {
        let spec = TableSpec::new().column("id", "INTEGER").column("name", "TEXT");
        let sql = generate_create_table_sql(&resolve(&spec));
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY NOT NULL"));
    }

    #[test]
    fn test_no_primary_key_without_id() {
        let spec = TableSpec::new().column("name", "TEXT");
        let sql = generate_create_table_sql(&resolve(&spec));
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_extended_columns_use_native_storage() {
        let spec = TableSpec::new()
            .column("uid", UUID)
            .column("updated", UPDATED_AT);
        let sql = generate_create_table_sql(&resolve(&spec));
        assert!(sql.contains("\"uid\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"updated\" TEXT NOT NULL"));
    }

    #[test]
    fn test_composite_primary_key_is_table_constraint() {
        let spec = TableSpec::new()
            .column("a", "INTEGER")
            .column("b", "TEXT")
            .composite_key(["a", "b"]);
        let sql = generate_create_table_sql(&resolve(&spec));
        assert!(sql.contains("PRIMARY KEY (\"a\", \"b\")"));
        assert!(sql.contains("\"a\" INTEGER NOT NULL,"));

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&sql).unwrap();
        let pk: Vec<i64> = table_info(&conn, "people").into_iter().map(|c| c.3).collect();
        assert_eq!(pk, [1, 2]);
    }

    #[test]
    fn test_generated_sql_executes_and_is_idempotent() {
        let spec = people();
        let sql = generate_create_table_sql(&resolve(&spec));
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&sql).unwrap();
        let before = table_info(&conn, "people");
        conn.execute_batch(&sql).unwrap();
        assert_eq!(table_info(&conn, "people"), before);
        assert_eq!(
            before,
            vec![
                ("id".to_string(), "INTEGER".to_string(), true, 1),
                ("name".to_string(), "TEXT".to_string(), true, 0),
                ("birthdate".to_string(), "TEXT".to_string(), false, 0),
            ]
        );
    }

    #[test]
    fn test_generate_table_sql_reports_schema_errors() {
        let spec = TableSpec::new().column("when", "DATETIME");
        let err = generate_table_sql("events", &spec, &TypeRegistry::default()).unwrap_err();
        assert!(matches!(err, DatastoreError::InvalidSchema(_)));
        assert!(err.to_string().contains("DATETIME"));

        let spec = TableSpec::new()
            .column("seq", ColumnOptions::new("INTEGER").auto_increment())
            .column("name", "TEXT");
        let err = generate_table_sql("events", &spec, &TypeRegistry::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("events") && message.contains("seq"));
    }

    #[test]
    fn test_schema_sql_keeps_table_order() {
        let schema = Schema::new()
            .table("people", people())
            .table("pets", TableSpec::new().column("name", "TEXT"));
        let resolved = ResolvedSchema::resolve(&schema, &TypeRegistry::default()).unwrap();
        let sql = generate_schema_sql(&resolved);
        let people_at = sql.find("\"people\"").unwrap();
        let pets_at = sql.find("\"pets\"").unwrap();
        assert!(people_at < pets_at);

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&sql).unwrap();
    }
}
