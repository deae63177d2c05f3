//! Integration tests for the schemastore-sqlite crate.

use std::sync::Arc;

use rusqlite::Connection;
use schemastore_core::registry::{CREATED_AT, UUID};
use schemastore_core::{
    ColumnOptions, Criteria, ExtendedType, HookError, NativeType, Record, Schema, TableSpec,
    TypeRegistry, Value,
};
use schemastore_sqlite::{
    Datastore, DatastoreConfig, DatastoreError, DeleteOptions, InsertOptions, SelectOptions,
    UpdateOptions, load_schema,
};
use serde::Deserialize;
use tempfile::TempDir;

/// `people(id INTEGER autoincrement pk, name TEXT, birthdate TEXT nullable)`.
fn people_schema() -> Schema {
    Schema::new().table(
        "people",
        TableSpec::new()
            .column("id", ColumnOptions::new("INTEGER").auto_increment())
            .column("name", ColumnOptions::new("TEXT"))
            .column("birthdate", ColumnOptions::new("TEXT").nullable()),
    )
}

fn named(name: &str) -> Record {
    Record::new().with("name", name)
}

fn file_store(dir: &TempDir, schema: Schema) -> Datastore {
    Datastore::open(
        DatastoreConfig::file(dir.path().join("store.db")),
        schema,
        Arc::new(TypeRegistry::default()),
    )
}

fn names(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(String::from))
        .collect()
}

#[tokio::test]
async fn test_delete_then_select_scenario() {
    let store = Datastore::in_memory(people_schema());
    store.insert("people", vec![named("foo"), named("bar")]).await.unwrap();

    let deleted = store
        .delete("people", DeleteOptions::filter(Criteria::new().eq("name", "foo")))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let rows = store.select("people", SelectOptions::new()).await.unwrap();
    assert_eq!(
        rows,
        vec![Record::new().with("id", 2).with("name", "bar").with("birthdate", Value::Null)]
    );
}

#[tokio::test]
async fn test_update_without_where_touches_every_row() {
    let store = Datastore::in_memory(people_schema());
    store.insert("people", vec![named("foo"), named("bar")]).await.unwrap();

    let updated = store
        .update("people", UpdateOptions::new(named("baz")))
        .await
        .unwrap();
    assert_eq!(updated, 2);
    let rows = store.select("people", SelectOptions::new()).await.unwrap();
    assert_eq!(names(&rows), ["baz", "baz"]);
}

#[tokio::test]
async fn test_membership_criteria_keeps_table_order() {
    let store = Datastore::in_memory(people_schema());
    store
        .insert("people", vec![named("foo"), named("bar"), named("baz")])
        .await
        .unwrap();

    let rows = store
        .select("people", Criteria::new().any_of("name", ["bar", "foo"]))
        .await
        .unwrap();
    assert_eq!(names(&rows), ["foo", "bar"]);
    assert_eq!(
        store
            .count("people", Criteria::new().any_of("name", ["bar", "foo"]))
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_auto_increment_ids_are_sequential() {
    let store = Datastore::in_memory(people_schema());
    store.insert("people", named("first")).await.unwrap();

    let batch: Vec<Record> = (0..5).map(|i| named(&format!("p{i}"))).collect();
    let result = store.insert("people", batch).await.unwrap();
    assert_eq!(result.count, 5);
    assert_eq!(result.ids, Some(vec![2, 3, 4, 5, 6]));
}

#[tokio::test]
async fn test_ids_on_request_for_plain_tables() {
    let schema = Schema::new().table("tags", TableSpec::new().column("label", "TEXT"));
    let store = Datastore::in_memory(schema);

    let result = store.insert("tags", Record::new().with("label", "a")).await.unwrap();
    assert_eq!(result.ids, None);

    let options = InsertOptions::new("tags", vec![Record::new().with("label", "b")]).return_ids();
    let result = store.insert_with(options).await.unwrap();
    assert_eq!(result.ids, Some(vec![2]));
}

#[tokio::test]
async fn test_heterogeneous_batch_fills_nulls() {
    let store = Datastore::in_memory(people_schema());
    store
        .insert(
            "people",
            vec![
                named("foo"),
                named("bar").with("birthdate", "1990-04-01"),
                named("baz"),
            ],
        )
        .await
        .unwrap();

    let births: Vec<Value> = store
        .select("people", SelectOptions::new())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.get("birthdate").cloned().unwrap())
        .collect();
    assert_eq!(births, [Value::Null, Value::from("1990-04-01"), Value::Null]);
    assert_eq!(store.count("people", Criteria::new().is_null("birthdate")).await.unwrap(), 2);
}

#[tokio::test]
async fn test_unique_violation_names_table_and_column() {
    let schema = Schema::new().table(
        "people",
        TableSpec::new()
            .column("id", ColumnOptions::new("INTEGER").auto_increment())
            .column("name", ColumnOptions::new("TEXT").unique()),
    );
    let store = Datastore::in_memory(schema);
    store.insert("people", named("foo")).await.unwrap();

    let err = store.insert("people", named("foo")).await.unwrap_err();
    match err {
        DatastoreError::UniqueConstraintViolation { table, column } => {
            assert_eq!(table, "people");
            assert_eq!(column, "name");
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_requires_scope_before_touching_engine() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir, people_schema());

    let err = store.delete("people", DeleteOptions::default()).await.unwrap_err();
    assert!(matches!(err, DatastoreError::MissingDeleteScope(ref t) if t == "people"));
    let both = DeleteOptions {
        all: true,
        filter: Some(Criteria::new()),
    };
    assert!(matches!(
        store.delete("people", both).await,
        Err(DatastoreError::AmbiguousDeleteScope(_))
    ));
    assert!(!dir.path().join("store.db").exists());

    store.insert("people", vec![named("a"), named("b")]).await.unwrap();
    assert_eq!(store.delete("people", DeleteOptions::all()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir, people_schema());
    store.migrate().await.unwrap();
    store.insert("people", named("foo")).await.unwrap();

    let ddl = |conn: &Connection| -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT sql FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let rows = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        rows
    };
    let probe = Connection::open(dir.path().join("store.db")).unwrap();
    let before = ddl(&probe);

    store.migrate().await.unwrap();
    assert_eq!(ddl(&probe), before);
    assert_eq!(store.count("people", SelectOptions::new()).await.unwrap(), 1);
    assert!(before.iter().any(|sql| sql.contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#)));
}

#[tokio::test]
async fn test_table_dropped_out_of_band() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir, people_schema());
    store.insert("people", named("foo")).await.unwrap();

    let other = Connection::open(dir.path().join("store.db")).unwrap();
    other.execute_batch(r#"DROP TABLE "people""#).unwrap();
    drop(other);

    let err = store.select("people", SelectOptions::new()).await.unwrap_err();
    assert!(matches!(err, DatastoreError::NoSuchTable(ref t) if t == "people"));
    assert!(!store.status().await.unwrap().is_complete());

    store.migrate().await.unwrap();
    assert_eq!(store.count("people", SelectOptions::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_operator_filters_never_widen_to_every_row() {
    let store = Datastore::in_memory(people_schema());
    store.insert("people", vec![named("foo"), named("bar")]).await.unwrap();

    let options: DeleteOptions = serde_json::from_str(r#"{"where": {"name": {"eq": null}}}"#).unwrap();
    assert_eq!(store.delete("people", options).await.unwrap(), 0);

    let options: DeleteOptions = serde_json::from_str(r#"{"where": {"name": {}}}"#).unwrap();
    let err = store.delete("people", options).await.unwrap_err();
    assert!(matches!(err, DatastoreError::InvalidCriteria(ref m) if m.contains("name")));

    let filter: Criteria = serde_json::from_str(r#"{"birthdate": {}}"#).unwrap();
    let err = store
        .update("people", UpdateOptions::new(named("baz")).filter(filter))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::InvalidCriteria(_)));

    assert!(serde_json::from_str::<DeleteOptions>(r#"{"where": {"name": {"is": "foo"}}}"#).is_err());

    let rows = store.select("people", SelectOptions::new()).await.unwrap();
    assert_eq!(names(&rows), ["foo", "bar"]);

    let filter: Criteria = serde_json::from_str(r#"{"birthdate": {"eq": null}, "name": {"neq": "foo"}}"#).unwrap();
    assert_eq!(store.count("people", filter).await.unwrap(), 1);
}

#[tokio::test]
async fn test_explicit_null_is_stored_over_default() {
    let schema = Schema::new().table(
        "scores",
        TableSpec::new()
            .column("id", ColumnOptions::new("INTEGER").auto_increment())
            .column("name", "TEXT")
            .column("score", ColumnOptions::new("INTEGER").nullable().default_value(10)),
    );
    let store = Datastore::in_memory(schema);
    store
        .insert("scores", vec![named("a").with("score", Value::Null), named("b")])
        .await
        .unwrap();

    let a = store.select("scores", Criteria::new().eq("name", "a")).await.unwrap();
    assert_eq!(a[0].get("score"), Some(&Value::Null));
    let b = store.select("scores", Criteria::new().eq("name", "b")).await.unwrap();
    assert_eq!(b[0].get("score"), Some(&Value::Integer(10)));
}

#[tokio::test]
async fn test_extended_column_rejects_default_value() {
    let schema = Schema::from_json_str(
        r#"{"flags": {"columns": {"name": "TEXT", "active": {"type": "BOOLEAN", "defaultValue": true}}}}"#,
    )
    .unwrap();
    let store = Datastore::in_memory(schema);
    let err = store.insert("flags", named("a")).await.unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, DatastoreError::InvalidSchema(_)));
    assert!(message.contains("flags") && message.contains("active"));
}

#[tokio::test]
async fn test_uuid_column_generates_and_validates() {
    let schema = Schema::new().table(
        "sessions",
        TableSpec::new()
            .column("id", ColumnOptions::new("INTEGER").auto_increment())
            .column("token", UUID),
    );
    let store = Datastore::in_memory(schema);

    store.insert("sessions", Record::new()).await.unwrap();
    let rows = store.select("sessions", SelectOptions::new()).await.unwrap();
    let token = rows[0].get("token").and_then(Value::as_str).unwrap();
    assert_eq!(token.len(), 36);
    assert_eq!(token.matches('-').count(), 4);

    let err = store
        .insert("sessions", Record::new().with("token", "1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::InvalidIdentifier(ref id) if id == "1234"));

    let fixed = "0b6f8e1a-52c4-4d3e-9a7b-3c2d1e0f9a8b";
    store
        .insert("sessions", Record::new().with("token", fixed))
        .await
        .unwrap();
    let rows = store
        .select("sessions", Criteria::new().eq("token", fixed))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Integer(2)));
}

fn cents_registry() -> TypeRegistry {
    fn to_cents(column: &str, record: &mut Record) -> Result<(), HookError> {
        let cents = match record.get(column) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Real(amount)) => (amount * 100.0).round() as i64,
            Some(Value::Integer(amount)) => amount * 100,
            Some(other) => {
                return Err(HookError::Serialization {
                    value: other.clone(),
                    message: "amount must be numeric".to_string(),
                });
            }
        };
        record.insert(column, cents);
        Ok(())
    }

    let mut registry = TypeRegistry::default();
    registry
        .register(
            ExtendedType::new("MONEY", NativeType::Integer)
                .before_insert(to_cents)
                .before_update(to_cents)
                .parse(|stored| match stored {
                    Value::Integer(cents) => Ok(Value::Real(*cents as f64 / 100.0)),
                    other => Ok(other.clone()),
                }),
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn test_custom_type_round_trip() {
    let schema = Schema::new().table(
        "orders",
        TableSpec::new()
            .column("id", ColumnOptions::new("INTEGER").auto_increment())
            .column("total", "MONEY")
            .column("created", CREATED_AT),
    );
    let store = Datastore::open(DatastoreConfig::in_memory(), schema, Arc::new(cents_registry()));

    store
        .insert("orders", Record::new().with("total", 12.34))
        .await
        .unwrap();
    let rows = store.select("orders", SelectOptions::new()).await.unwrap();
    assert_eq!(rows[0].get("total"), Some(&Value::Real(12.34)));
    assert!(rows[0].get("created").and_then(Value::as_timestamp).is_some());

    let err = store
        .update("orders", UpdateOptions::new(Record::new().with("total", "lots")))
        .await
        .unwrap_err();
    match err {
        DatastoreError::SerializationError { value, .. } => assert_eq!(value, Value::from("lots")),
        other => panic!("expected serialization error, got {other:?}"),
    }

    let matched = store
        .update(
            "orders",
            UpdateOptions::new(Record::new().with("total", 20)).filter(Criteria::new().eq("id", 1)),
        )
        .await
        .unwrap();
    assert_eq!(matched, 1);
    let rows = store.select("orders", SelectOptions::new()).await.unwrap();
    assert_eq!(rows[0].get("total"), Some(&Value::Real(20.0)));
}

#[tokio::test]
async fn test_select_as_struct() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Person {
        id: i64,
        name: String,
        birthdate: Option<String>,
    }

    let store = Datastore::in_memory(people_schema());
    store
        .insert("people", vec![named("foo"), named("bar").with("birthdate", "2001-02-03")])
        .await
        .unwrap();

    let people: Vec<Person> = store
        .select_as("people", Criteria::new().gte("id", 2))
        .await
        .unwrap();
    assert_eq!(
        people,
        [Person {
            id: 2,
            name: "bar".into(),
            birthdate: Some("2001-02-03".into()),
        }]
    );
}

#[tokio::test]
async fn test_unknown_column_is_caller_error() {
    let store = Datastore::in_memory(people_schema());
    let err = store
        .insert("people", named("foo").with("age", 3))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::InsertError { ref message, .. } if message.contains("age")));

    let err = store
        .update("people", UpdateOptions::new(Record::new().with("age", 3)))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::UpdateError { .. }));

    let err = store
        .select("people", Criteria::new().eq("age", 3))
        .await
        .unwrap_err();
    assert!(matches!(err, DatastoreError::NoSuchColumn(ref c) if c == "age"));
}

#[tokio::test]
async fn test_concurrent_first_operations() {
    let store = Arc::new(Datastore::in_memory(people_schema()));
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert("people", named(&format!("p{i}"))).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(store.count("people", SelectOptions::new()).await.unwrap(), 8);
}

#[tokio::test]
async fn test_open_from_config_and_schema_files() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("datastore.yaml");
    let schema_path = dir.path().join("schema.yaml");
    std::fs::write(
        &config_path,
        format!(
            "filename: {}\nbusy_timeout_ms: 1000\n",
            dir.path().join("app.db").display()
        ),
    )
    .unwrap();
    std::fs::write(
        &schema_path,
        "people:\n  columns:\n    id: { type: INTEGER, autoIncrement: true }\n    name: TEXT\n    active: { type: INTEGER, defaultValue: 1 }\n",
    )
    .unwrap();

    let config = DatastoreConfig::load(&config_path).unwrap();
    let store = Datastore::open(config, load_schema(&schema_path).unwrap(), Arc::new(TypeRegistry::default()));
    assert!(store.filename().ends_with("app.db"));

    store.insert("people", named("foo")).await.unwrap();
    let rows = store.select("people", SelectOptions::new()).await.unwrap();
    assert_eq!(rows[0].get("active"), Some(&Value::Integer(1)));

    let status = store.status().await.unwrap();
    assert_eq!(status.table("people").map(|t| t.row_count), Some(1));
    store.close().await.unwrap();
    assert!(dir.path().join("app.db").exists());
}
