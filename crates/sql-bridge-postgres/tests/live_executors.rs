//! Integration tests for the synchronous and asynchronous executors.
//!
//! These tests require a PostgreSQL database to be running.
//! Set POSTGRES_URL (or DATABASE_URL) to a connection string, then run:
//!
//!   cargo test --package sql-bridge-postgres --test live_executors -- --ignored

use std::sync::Arc;

use postgres::NoTls;
use sql_bridge_core::{
    insert_into, select, select_from_schema, ExprOps, FieldValue, QueryCompiler, SchemaColumns,
    TableSchema, TableSchemaRef,
};
use sql_bridge_common::{ErrorFamily, ServerError};
use sql_bridge_postgres::{AsyncExecutor, PgParams, PostgresDialect, SyncExecutor};

fn database_url() -> String {
    std::env::var("POSTGRES_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap_or_else(|_| "postgresql://localhost/test_db".to_string())
}

fn sync_client() -> postgres::Client {
    postgres::Client::connect(&database_url(), NoTls).expect("Failed to connect to database")
}

fn compiler() -> QueryCompiler {
    QueryCompiler::new(Arc::new(PostgresDialect::new()))
}

fn scalar_params(values: &[FieldValue]) -> PgParams {
    let mut params = PgParams::new();
    for value in values {
        params.push(value);
    }
    params
}

fn round_trip_table(client: &mut postgres::Client) -> TableSchemaRef {
    client
        .batch_execute(
            "DROP TABLE IF EXISTS bridge_round_trip;
             CREATE TABLE bridge_round_trip (
                 id INTEGER PRIMARY KEY,
                 flag BOOLEAN,
                 big BIGINT,
                 ratio DOUBLE PRECISION,
                 label TEXT,
                 blob BYTEA,
                 email TEXT UNIQUE
             )",
        )
        .expect("Failed to create test table");
    TableSchema::new("bridge_round_trip")
        .add_field::<i32>("id", "INTEGER")
        .primary_key("id")
        .add_field::<bool>("flag", "BOOLEAN")
        .add_field::<i64>("big", "BIGINT")
        .add_field::<f64>("ratio", "DOUBLE PRECISION")
        .add_field::<String>("label", "TEXT")
        .add_field::<Vec<u8>>("blob", "BYTEA")
        .add_field::<String>("email", "TEXT")
        .unique("email")
        .into_ref()
}

#[test]
#[ignore]
fn test_scalar_round_trips() {
    let mut client = sync_client();
    let mut executor = SyncExecutor::new(&mut client);

    let cases = vec![
        ("SELECT $1::bool", FieldValue::Bool(true)),
        ("SELECT $1::bool", FieldValue::Bool(false)),
        ("SELECT $1::int4", FieldValue::I32(i32::MIN)),
        ("SELECT $1::int4", FieldValue::I32(i32::MAX)),
        ("SELECT $1::int8", FieldValue::I64(i64::MIN)),
        ("SELECT $1::int8", FieldValue::I64(i64::MAX)),
        ("SELECT $1::float8", FieldValue::F64(1.5)),
        ("SELECT $1::float8", FieldValue::F64(f64::INFINITY)),
        ("SELECT $1::float8", FieldValue::F64(f64::NEG_INFINITY)),
        ("SELECT $1::text", FieldValue::from("héllo wörld ❤")),
        ("SELECT $1::text", FieldValue::from("")),
        ("SELECT $1::bytea", FieldValue::from(vec![0u8, 1, 2, 255])),
    ];

    for (sql, value) in cases {
        let params = scalar_params(std::slice::from_ref(&value));
        let block = executor.execute_with(sql, &params).unwrap();
        assert_eq!(block.rows(), 1);
        let row = block.row(0).unwrap();
        let field = row.at(0).unwrap();
        match &value {
            FieldValue::Bool(v) => assert_eq!(field.get::<bool>().unwrap(), *v),
            FieldValue::I32(v) => assert_eq!(field.get::<i32>().unwrap(), *v),
            FieldValue::I64(v) => assert_eq!(field.get::<i64>().unwrap(), *v),
            FieldValue::F64(v) => assert_eq!(field.get::<f64>().unwrap(), *v),
            FieldValue::Text(v) => assert_eq!(&field.get::<String>().unwrap(), v),
            FieldValue::Bytes(v) => assert_eq!(field.get::<Vec<u8>>().unwrap(), v.to_vec()),
            FieldValue::Null => unreachable!(),
        }
    }
}

#[test]
#[ignore]
fn test_nan_round_trips_bitwise() {
    let mut client = sync_client();
    let mut executor = SyncExecutor::new(&mut client);

    let params = scalar_params(&[FieldValue::F64(f64::NAN)]);
    let block = executor.execute_with("SELECT $1::float8", &params).unwrap();
    let decoded: f64 = block.get(0, 0).unwrap();
    assert_eq!(decoded.to_bits(), f64::NAN.to_bits());
}

#[test]
#[ignore]
fn test_null_round_trip() {
    let mut client = sync_client();
    let mut executor = SyncExecutor::new(&mut client);

    let params = scalar_params(&[FieldValue::Null]);
    let block = executor.execute_with("SELECT $1", &params).unwrap();
    assert_eq!(block.rows(), 1);
    assert_eq!(block.cols(), 1);
    let field = block.row(0).unwrap().at(0).unwrap();
    assert!(field.is_null());
    assert_eq!(block.get_opt::<String>(0, 0).unwrap(), None);
}

#[test]
#[ignore]
fn test_large_string_round_trip() {
    let mut client = sync_client();
    let mut executor = SyncExecutor::new(&mut client);

    let large = "x".repeat(1 << 20);
    let tricky = "quote' newline\n backslash\\ done";
    for text in [large.as_str(), tricky] {
        let params = scalar_params(&[FieldValue::from(text)]);
        let block = executor.execute_with("SELECT $1::text", &params).unwrap();
        assert_eq!(block.get::<String>(0, 0).unwrap(), text);
    }
}

#[test]
#[ignore]
fn test_all_byte_values_round_trip() {
    let mut client = sync_client();
    let mut executor = SyncExecutor::new(&mut client);

    let all_bytes: Vec<u8> = (0u8..=255).collect();
    let params = scalar_params(&[FieldValue::from(all_bytes.clone())]);
    let block = executor.execute_with("SELECT $1::bytea", &params).unwrap();
    assert_eq!(block.get::<Vec<u8>>(0, 0).unwrap(), all_bytes);
}

#[test]
#[ignore]
fn test_insert_then_select_by_primary_key() {
    let mut client = sync_client();
    let schema = round_trip_table(&mut client);
    let mut executor = SyncExecutor::new(&mut client);
    let compiler = compiler();

    let insert = compiler
        .compile(
            insert_into(&schema)
                .columns(["id", "flag", "big", "ratio", "label", "blob", "email"])
                .values([
                    FieldValue::I32(1),
                    FieldValue::Bool(true),
                    FieldValue::I64(1 << 40),
                    FieldValue::F64(2.5),
                    FieldValue::from("row one"),
                    FieldValue::from(vec![9u8, 8, 7]),
                    FieldValue::from("one@example.com"),
                ]),
        )
        .unwrap();
    executor.execute_compiled(&insert).unwrap();

    let id = schema.column::<i32>("id").unwrap();
    let select_back = compiler
        .compile(select_from_schema(&schema).where_(id.eq(1)))
        .unwrap();
    let block = executor.execute_compiled(&select_back).unwrap();

    assert_eq!(block.rows(), 1);
    let row = block.row(0).unwrap();
    assert_eq!(row.field("id").unwrap().get::<i32>().unwrap(), 1);
    assert!(row.field("flag").unwrap().get::<bool>().unwrap());
    assert_eq!(row.field("big").unwrap().get::<i64>().unwrap(), 1 << 40);
    assert_eq!(row.field("ratio").unwrap().get::<f64>().unwrap(), 2.5);
    assert_eq!(row.field("label").unwrap().get::<String>().unwrap(), "row one");
    assert_eq!(row.field("blob").unwrap().get::<Vec<u8>>().unwrap(), vec![9, 8, 7]);
}

#[test]
#[ignore]
fn test_insert_returning_row() {
    let mut client = sync_client();
    let schema = round_trip_table(&mut client);
    let mut executor = SyncExecutor::new(&mut client);

    let insert = compiler()
        .compile(
            insert_into(&schema)
                .columns(["id", "label"])
                .values([FieldValue::I32(5), FieldValue::from("returned")])
                .returning(["id", "label"]),
        )
        .unwrap();
    let block = executor.execute_compiled(&insert).unwrap();

    assert_eq!(block.rows(), 1);
    assert_eq!(block.get::<i32>(0, 0).unwrap(), 5);
    assert_eq!(block.get::<String>(0, 1).unwrap(), "returned");
}

#[test]
#[ignore]
fn test_unique_violation_surfaces_sqlstate() {
    let mut client = sync_client();
    let schema = round_trip_table(&mut client);
    let mut executor = SyncExecutor::new(&mut client);
    let compiler = compiler();

    let row = |id: i32| {
        insert_into(&schema)
            .columns(["id", "email"])
            .values([FieldValue::I32(id), FieldValue::from("dup@example.com")])
    };
    executor
        .execute_compiled(&compiler.compile(row(1)).unwrap())
        .unwrap();
    let err = executor
        .execute_compiled(&compiler.compile(row(2)).unwrap())
        .unwrap_err();

    assert_eq!(err.code, ServerError::UniqueViolation.into());
    assert_eq!(err.sqlstate, "23505");
    assert_eq!(err.code.family(), ErrorFamily::Server);
    assert!(err.format().starts_with("[UniqueViolation] SQLSTATE 23505: "));
}

#[test]
#[ignore]
fn test_missing_table_error() {
    let mut client = sync_client();
    let mut executor = SyncExecutor::new(&mut client);
    let err = executor
        .execute("SELECT * FROM bridge_no_such_table")
        .unwrap_err();
    assert_eq!(err.code, ServerError::TableNotFound.into());
    assert_eq!(err.sqlstate, "42P01");
}

#[tokio::test]
#[ignore]
async fn test_async_executor_basic_query() {
    let mut executor = AsyncExecutor::connect(&database_url()).await.unwrap();
    assert!(executor.is_valid());

    let params = scalar_params(&[FieldValue::I32(21)]);
    let block = executor
        .execute_with("SELECT $1::int4 * 2", &params)
        .await
        .unwrap();
    assert_eq!(block.get::<i32>(0, 0).unwrap(), 42);
}

#[tokio::test]
#[ignore]
async fn test_async_fifo_ordering() {
    let mut executor = AsyncExecutor::connect(&database_url()).await.unwrap();

    for i in 0..10i32 {
        let params = scalar_params(&[FieldValue::I32(i)]);
        let block = executor.execute_with("SELECT $1::int4", &params).await.unwrap();
        assert_eq!(block.get::<i32>(0, 0).unwrap(), i);
    }
}

#[tokio::test]
#[ignore]
async fn test_async_cancellation_leaves_executor_usable() {
    let mut executor = AsyncExecutor::connect(&database_url()).await.unwrap();

    // Cancel a slow query by dropping its future at the timeout.
    let cancelled = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        executor.execute("SELECT pg_sleep(5)"),
    )
    .await;
    assert!(cancelled.is_err(), "expected the timeout to cancel the query");

    // The next call either completes normally or reports connection state;
    // after one round the executor must be usable again.
    match executor.execute("SELECT 1").await {
        Ok(block) => assert_eq!(block.get::<i32>(0, 0).unwrap(), 1),
        Err(first) => {
            assert_eq!(first.code.family(), ErrorFamily::Client);
            let block = executor.execute("SELECT 1").await.unwrap();
            assert_eq!(block.get::<i32>(0, 0).unwrap(), 1);
        }
    }
}

#[tokio::test]
#[ignore]
async fn test_async_compiled_query() {
    let mut executor = AsyncExecutor::connect(&database_url()).await.unwrap();
    let compiler = compiler();

    let query = compiler.compile(select(sql_bridge_core::lit(7))).unwrap();
    let block = executor.execute_compiled(&query).await.unwrap();
    assert_eq!(block.get::<i32>(0, 0).unwrap(), 7);
}
